use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::export::ExportArtifact;

/// 导出产物的存储位置
pub trait Outlet {
    async fn save(&self, artifact: &ExportArtifact) -> Result<PathBuf>;
}

/// 写入本地目录
pub struct DiskOutlet {
    output_dir: PathBuf,
}

impl DiskOutlet {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn ensure_dir(&self) -> Result<()> {
        if !fs::try_exists(&self.output_dir).await.unwrap_or(false) {
            fs::create_dir_all(&self.output_dir).await.context(format!(
                "Failed to create output directory: {:?}",
                self.output_dir
            ))?;
        }
        Ok(())
    }

    /// 保存渲染好的图表
    pub async fn save_svg(&self, file_name: &str, svg: &str) -> Result<PathBuf> {
        self.ensure_dir().await?;
        let path = self.output_dir.join(file_name);
        fs::write(&path, svg)
            .await
            .context(format!("Failed to write diagram: {:?}", path))?;
        Ok(path)
    }
}

impl Outlet for DiskOutlet {
    async fn save(&self, artifact: &ExportArtifact) -> Result<PathBuf> {
        self.ensure_dir().await?;
        let path = self.output_dir.join(&artifact.file_name);
        fs::write(&path, &artifact.bytes)
            .await
            .context(format!("Failed to write export artifact: {:?}", path))?;
        Ok(path)
    }
}
