use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

const DEFAULT_OCR_CMD: &str = "tesseract";
const DEFAULT_OCR_LANG: &str = "chi_tra";

/// Turns a label image into plain text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &Path) -> Result<String>;
}

/// Shells out to the `tesseract` CLI (`tesseract <image> stdout -l <lang>`).
#[derive(Clone, Debug)]
pub struct TesseractCli {
    pub cmd: String,
    pub lang: String,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self { cmd: DEFAULT_OCR_CMD.to_string(), lang: DEFAULT_OCR_LANG.to_string() }
    }
}

impl TesseractCli {
    pub fn from_env() -> Self {
        let mut t = Self::default();
        if let Ok(cmd) = std::env::var("HCT_OCR_CMD") { t.cmd = cmd; }
        if let Ok(lang) = std::env::var("HCT_OCR_LANG") { t.lang = lang; }
        t
    }
}

#[async_trait]
impl TextRecognizer for TesseractCli {
    async fn recognize(&self, image: &Path) -> Result<String> {
        let output = tokio::process::Command::new(&self.cmd)
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.lang])
            .output()
            .await
            .with_context(|| format!("run {} (set HCT_OCR_CMD to override)", self.cmd))?;
        if !output.status.success() {
            bail!("{} exited with {}: {}", self.cmd, output.status, String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
