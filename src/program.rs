use std::path::{Path, PathBuf};

/// How a program file is stored on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Compression {
    /// Raw bytes.
    #[default]
    None,
    /// Brotli-compressed bytes.
    Brotli,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decompress {}: {source}", path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read a program from `path`. Contents are not validated in any way.
pub fn load(path: &Path, compression: Compression) -> Result<Vec<u8>, LoadError> {
    let raw = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let program = decode(&raw, compression).map_err(|source| LoadError::Decompress {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        path = %path.display(),
        ?compression,
        stored = raw.len(),
        len = program.len(),
        "loaded program"
    );
    Ok(program)
}

/// Undo `compression` on an in-memory buffer.
pub fn decode(data: &[u8], compression: Compression) -> std::io::Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Brotli => {
            let mut out = Vec::new();
            brotli::BrotliDecompress(&mut &data[..], &mut out)?;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut compressed = Vec::new();
        let params = brotli::enc::BrotliEncoderParams::default();
        brotli::BrotliCompress(&mut &data[..], &mut compressed, &params).unwrap();
        compressed
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vmcursor-{}-{name}", std::process::id()))
    }

    #[test]
    fn decode_raw_is_identity() {
        let data = [0x01, 0x02, 0x66];
        assert_eq!(decode(&data, Compression::None).unwrap(), data.to_vec());
    }

    #[test]
    fn decode_brotli() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let compressed = compress(&data);
        assert_eq!(decode(&compressed, Compression::Brotli).unwrap(), data);
    }

    #[test]
    fn decode_truncated_brotli_fails() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::SmallRng::seed_from_u64(7);
        let data: Vec<u8> = (0..4096).map(|_| rng.r#gen()).collect();
        let compressed = compress(&data);
        let half = &compressed[..compressed.len() / 2];
        assert!(decode(half, Compression::Brotli).is_err());
    }

    #[test]
    fn load_raw_and_compressed() {
        let data = vec![0x10, 0x20, 0x30, 0x66, 0x00];
        let raw_path = temp_path("raw.bin");
        let br_path = temp_path("prog.br");
        std::fs::write(&raw_path, &data).unwrap();
        std::fs::write(&br_path, compress(&data)).unwrap();

        assert_eq!(load(&raw_path, Compression::None).unwrap(), data);
        assert_eq!(load(&br_path, Compression::Brotli).unwrap(), data);

        std::fs::remove_file(raw_path).unwrap();
        std::fs::remove_file(br_path).unwrap();
    }

    #[test]
    fn load_missing_file() {
        let path = temp_path("does-not-exist.bin");
        let err = load(&path, Compression::None).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("does-not-exist.bin"));
    }
}
