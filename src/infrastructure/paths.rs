//! File locations derived for one run
//!
//! Everything is anchored on the dataset's directory: the default output is
//! `output.json` next to the dataset, and the checkpoint is a hidden file
//! named after the handler script so that runs with different scripts over
//! sibling datasets never share progress.

use std::path::{Path, PathBuf};

use crate::error::{ScrapeError, ScrapeResult};

pub const DEFAULT_OUTPUT_FILE: &str = "output.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub dataset: PathBuf,
    pub output: PathBuf,
    pub script: PathBuf,
    pub checkpoint: PathBuf,
}

impl RunPaths {
    pub fn derive(dataset: &Path, output: Option<&Path>, script: &Path) -> ScrapeResult<Self> {
        let dataset = absolutize(dataset);
        let workdir = dataset
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let project = script
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| ScrapeError::Script {
                path: script.to_path_buf(),
                reason: "script path has no file name".to_string(),
            })?;

        let output = output.map_or_else(|| workdir.join(DEFAULT_OUTPUT_FILE), absolutize);
        let checkpoint = workdir.join(format!(".{project}.progress.json"));

        Ok(Self {
            dataset,
            output,
            script: absolutize(script),
            checkpoint,
        })
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_and_output_sit_next_to_dataset() {
        let paths = RunPaths::derive(
            Path::new("/data/shop/products.json"),
            None,
            Path::new("/scripts/product.json"),
        )
        .unwrap();

        assert_eq!(paths.output, PathBuf::from("/data/shop/output.json"));
        assert_eq!(paths.checkpoint, PathBuf::from("/data/shop/.product.progress.json"));
    }

    #[test]
    fn explicit_output_is_kept() {
        let paths = RunPaths::derive(
            Path::new("/data/products.json"),
            Some(Path::new("/tmp/enriched.json")),
            Path::new("seller.json"),
        )
        .unwrap();
        assert_eq!(paths.output, PathBuf::from("/tmp/enriched.json"));
        assert_eq!(paths.checkpoint, PathBuf::from("/data/.seller.progress.json"));
        assert!(paths.script.is_absolute());
    }

    #[test]
    fn different_scripts_get_different_checkpoints() {
        let a = RunPaths::derive(Path::new("/d/x.json"), None, Path::new("a.json")).unwrap();
        let b = RunPaths::derive(Path::new("/d/x.json"), None, Path::new("b.json")).unwrap();
        assert_ne!(a.checkpoint, b.checkpoint);
    }
}
