use anyhow::{Context, Result};
use std::path::Path;

/// A raw object file mapped at `base`.
#[derive(Debug, Clone)]
pub struct Image {
    pub base: u32,
    pub bytes: Vec<u8>,
}

/// Reads an object file written by `vsam`, optionally windowed by `skip`/`len`.
pub fn load_raw_bin(path: &Path, base: u32, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let rest = file
        .get(skip..)
        .context("--skip runs past the end of the object file")?;
    let bytes = match len {
        Some(n) => rest
            .get(..n)
            .context("--len runs past the end of the object file")?,
        None => rest,
    };
    Ok(Image { base, bytes: bytes.to_vec() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_applies_skip_and_len() {
        let path = std::env::temp_dir().join("_vmlang_disasm_model.bin");
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5]).unwrap();
        let img = load_raw_bin(&path, 0x100, 2, Some(3)).unwrap();
        assert_eq!(img.base, 0x100);
        assert_eq!(img.bytes, vec![2, 3, 4]);
        assert!(load_raw_bin(&path, 0, 7, None).is_err());
        assert!(load_raw_bin(&path, 0, 2, Some(5)).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
