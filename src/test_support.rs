//! Helpers shared by unit tests: in-memory PDFs, tiny PNGs, a one-shot HTTP
//! server and a scripted viewer driver.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use lopdf::{Document, Object, Stream, dictionary};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::driver::{DriverLauncher, ViewerDriver};

/// Build a PDF with `pages` blank 16:9 pages.
pub fn build_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages as i64,
        "MediaBox" => vec![0.into(), 0.into(), 720.into(), 405.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// A small solid-colour PNG whose colour encodes `seed`.
pub fn tiny_png(seed: u8) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 3, image::Rgb([seed, 0, 255 - seed]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

/// Serve exactly one PDF response and return a URL pointing at it.
pub async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
    serve_response(status, vec![("Content-Type", "application/pdf".to_string())], body).await
}

/// Serve exactly one HTTP response with the given headers.
pub async fn serve_response(
    status: &'static str,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let mut head = format!("HTTP/1.1 {}\r\n", status);
            for (name, value) in &headers {
                head.push_str(&format!("{}: {}\r\n", name, value));
            }
            head.push_str(&format!(
                "Content-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            ));
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}/presentation/d/test/export/pdf", addr)
}

/// Everything a [`FakeDriver`] was asked to do, shared with the test.
#[derive(Debug, Default)]
pub struct DriverLog {
    pub opened: Vec<String>,
    pub clicks: usize,
    pub screenshots: usize,
    pub shutdowns: usize,
    pub drops: usize,
}

/// Scripted stand-in for a browser page
#[derive(Debug, Clone)]
pub struct FakeViewer {
    pub count_text: String,
    pub missing: HashSet<String>,
    pub fail_click_after: Option<usize>,
    pub empty_screenshot_at: Option<usize>,
    pub fail_open: bool,
    pub open_hangs: bool,
    pub shutdown_hangs: bool,
}

impl FakeViewer {
    pub fn with_slides(total: usize) -> Self {
        Self {
            count_text: total.to_string(),
            missing: HashSet::new(),
            fail_click_after: None,
            empty_screenshot_at: None,
            fail_open: false,
            open_hangs: false,
            shutdown_hangs: false,
        }
    }

    pub fn without(mut self, selector: &str) -> Self {
        self.missing.insert(selector.to_string());
        self
    }
}

#[derive(Debug)]
pub struct FakeDriver {
    viewer: FakeViewer,
    current: usize,
    log: Arc<Mutex<DriverLog>>,
}

impl Drop for FakeDriver {
    fn drop(&mut self) {
        self.log.lock().unwrap().drops += 1;
    }
}

impl ViewerDriver for FakeDriver {
    async fn open(&mut self, url: &str) -> Result<()> {
        self.log.lock().unwrap().opened.push(url.to_string());
        if self.viewer.fail_open {
            return Err(anyhow!("browser crashed"));
        }
        if self.viewer.open_hangs {
            std::future::pending::<()>().await;
        }
        self.current = 1;
        Ok(())
    }

    async fn is_present(&mut self, selector: &str) -> Result<bool> {
        Ok(!self.viewer.missing.contains(selector))
    }

    async fn text(&mut self, _selector: &str) -> Result<String> {
        Ok(self.viewer.count_text.clone())
    }

    async fn screenshot_element(&mut self, _selector: &str) -> Result<Vec<u8>> {
        self.log.lock().unwrap().screenshots += 1;
        if self.viewer.empty_screenshot_at == Some(self.current) {
            return Ok(Vec::new());
        }
        Ok(tiny_png(self.current as u8))
    }

    async fn click(&mut self, _selector: &str) -> Result<()> {
        if let Some(limit) = self.viewer.fail_click_after {
            if self.log.lock().unwrap().clicks >= limit {
                return Err(anyhow!("element is not clickable"));
            }
        }
        self.log.lock().unwrap().clicks += 1;
        self.current += 1;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.log.lock().unwrap().shutdowns += 1;
        if self.viewer.shutdown_hangs {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Hands out [`FakeDriver`]s and counts launches.
#[derive(Debug, Clone)]
pub struct FakeLauncher {
    pub viewer: FakeViewer,
    pub log: Arc<Mutex<DriverLog>>,
    pub launches: Arc<Mutex<usize>>,
    pub fail_launch: bool,
}

impl FakeLauncher {
    pub fn new(viewer: FakeViewer) -> Self {
        Self {
            viewer,
            log: Arc::default(),
            launches: Arc::default(),
            fail_launch: false,
        }
    }

    pub fn launches(&self) -> usize {
        *self.launches.lock().unwrap()
    }
}

impl DriverLauncher for FakeLauncher {
    type Driver = FakeDriver;

    async fn launch(&self) -> Result<FakeDriver> {
        if self.fail_launch {
            return Err(anyhow!("chrome not found"));
        }
        *self.launches.lock().unwrap() += 1;
        Ok(FakeDriver {
            viewer: self.viewer.clone(),
            current: 0,
            log: Arc::clone(&self.log),
        })
    }
}
