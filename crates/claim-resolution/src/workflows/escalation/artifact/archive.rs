use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::report::REPORT_FILE_NAME;
use super::ArtifactError;

/// Downloaded photo ready for packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoBlob {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// `photos/photo_001.jpg`, numbered from one in upload order.
pub fn photo_entry_name(position: usize, photo: &PhotoBlob) -> String {
    format!("photos/photo_{:03}.{}", position, extension(photo))
}

pub fn pack(report_html: &str, photos: &[PhotoBlob]) -> Result<Vec<u8>, ArtifactError> {
    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));

    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    archive.start_file(REPORT_FILE_NAME, deflated)?;
    archive.write_all(report_html.as_bytes())?;

    // Images are already compressed.
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (index, photo) in photos.iter().enumerate() {
        archive.start_file(photo_entry_name(index + 1, photo), stored)?;
        archive.write_all(&photo.bytes)?;
    }

    Ok(archive.finish()?.into_inner())
}

fn extension(photo: &PhotoBlob) -> String {
    let from_name = photo
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return if ext == "jpeg" { "jpg".to_string() } else { ext };
    }

    let parsed = photo
        .content_type
        .as_deref()
        .and_then(|raw| raw.parse::<mime::Mime>().ok());
    match parsed {
        Some(parsed) if parsed.type_() == mime::IMAGE => {
            let subtype = parsed.subtype();
            if subtype == mime::JPEG {
                "jpg".to_string()
            } else {
                subtype.as_str().to_ascii_lowercase()
            }
        }
        _ => "bin".to_string(),
    }
}
