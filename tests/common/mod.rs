//! Shared utilities for integration tests.

use std::io::Cursor;
use std::net::SocketAddr;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imgops_service::config::ServiceConfig;
use imgops_service::{HttpServer, Shutdown};
use reqwest::multipart::{Form, Part};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Deterministic noisy RGB image. Noise keeps PNG from compressing it much,
/// so 58×58 encodes to roughly 10 KB.
pub fn noisy_image(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x1234_5678;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        Rgb([next(), next(), next()])
    }))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    image.write_to(&mut Cursor::new(&mut out), format).unwrap();
    out
}

/// PNG fixture of about 10 000 bytes.
pub fn fixture_png() -> Vec<u8> {
    encode(&noisy_image(58, 58), ImageFormat::Png)
}

/// Multipart form with an image part and text fields.
pub fn image_form(png: Vec<u8>, fields: &[(&str, &str)]) -> Form {
    let mut form = Form::new().part(
        "image",
        Part::bytes(png)
            .file_name("fixture.png")
            .mime_str("image/png")
            .unwrap(),
    );
    for (name, value) in fields {
        form = form.text(name.to_string(), value.to_string());
    }
    form
}

/// Configuration that never finds models and has no segmentation program.
pub fn isolated_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.models.local_dir = "/nonexistent/imgops-tests/models".into();
    config.models.shared_dir = Some("/nonexistent/imgops-tests/shared".into());
    config.models.base_dir = "/nonexistent/imgops-tests/base".into();
    config.backends.segmentation = None;
    config
}

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_tx: mpsc::UnboundedSender<ServiceConfig>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_server(config: ServiceConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestServer {
        addr,
        shutdown,
        config_tx,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
