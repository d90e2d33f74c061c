use crate::error::{CoreError, CoreResult};
use std::io::{Cursor, Read, Write};
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

// Identical entries must always produce identical archive bytes:
// - entries sorted by path
// - fixed DOS-epoch timestamps and file mode
// - fixed compression method/level
// - empty archive comment
pub fn zip_entries_deterministic(entries: &[(String, Vec<u8>)]) -> CoreResult<Vec<u8>> {
    let mut sorted: Vec<&(String, Vec<u8>)> = entries.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    if sorted.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(CoreError::Zip("duplicate archive entry path".to_string()));
    }

    let fixed_time = zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0).map_err(|_| {
        CoreError::DeterminismViolation("failed to create fixed zip datetime".to_string())
    })?;
    let opts = FileOptions::<()>::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
        .last_modified_time(fixed_time)
        .unix_permissions(0o644);

    let mut zw = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, bytes) in sorted {
        zw.start_file(path.as_str(), opts)
            .map_err(|e| CoreError::Zip(e.to_string()))?;
        zw.write_all(bytes)?;
    }
    zw.set_comment("");
    let cursor = zw.finish().map_err(|e| CoreError::Zip(e.to_string()))?;
    Ok(cursor.into_inner())
}

pub fn read_zip_entries(bytes: &[u8]) -> CoreResult<Vec<(String, Vec<u8>)>> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| CoreError::Zip(e.to_string()))?;
    let mut out = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut f = archive
            .by_index(i)
            .map_err(|e| CoreError::Zip(e.to_string()))?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)?;
        out.push((f.name().to_string(), buf));
    }
    Ok(out)
}
