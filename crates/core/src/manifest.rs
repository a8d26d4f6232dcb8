use serde::{Deserialize, Serialize};

/// Where the super-resolution model comes from and what it is called locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub url: String,
    pub filename: String,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name: "realesrgan-x4plus".to_string(),
            url: "https://huggingface.co/qualcomm/Real-ESRGAN-x4plus/resolve/main/Real-ESRGAN-x4plus.onnx"
                .to_string(),
            filename: "realesrgan-x4plus.onnx".to_string(),
        }
    }
}

/// User-facing labels for the size descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub current: String,
    pub new: String,
    pub unknown_size: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            current: "Current size".to_string(),
            new: "New size".to_string(),
            unknown_size: "unknown size".to_string(),
        }
    }
}
