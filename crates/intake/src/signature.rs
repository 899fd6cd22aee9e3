use crate::error::IntakeError;

/// Zip container, used by `.xlsx`.
const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
/// Legacy Compound File Binary container, used by `.xls`.
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const TEXT_SAMPLE_LEN: usize = 8 * 1024;

/// File family derived from the declared extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Delimited,
    Workbook,
}

impl FileKind {
    pub fn from_name(file_name: &str) -> Result<Self, IntakeError> {
        let ext = file_name
            .rsplit('.')
            .next()
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" | "tsv" => Ok(FileKind::Delimited),
            "xlsx" | "xls" => Ok(FileKind::Workbook),
            other => Err(IntakeError::InvalidFormat(format!(
                "Unsupported file extension '.{other}'"
            ))),
        }
    }
}

/// Checks that the leading bytes agree with the declared extension before
/// any decoding happens. A mismatch fails intake with no batch created.
pub fn check_signature(file_name: &str, bytes: &[u8]) -> Result<FileKind, IntakeError> {
    let kind = FileKind::from_name(file_name)?;
    if bytes.is_empty() {
        return Err(IntakeError::InvalidFormat("File is empty".into()));
    }

    match kind {
        FileKind::Workbook => {
            if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(CFB_MAGIC) {
                Ok(kind)
            } else {
                Err(IntakeError::InvalidFormat(
                    "Leading bytes match neither the zip nor the legacy workbook container"
                        .into(),
                ))
            }
        }
        FileKind::Delimited => {
            let sample = &bytes[..bytes.len().min(TEXT_SAMPLE_LEN)];
            if sample.iter().any(|b| is_binary_control(*b)) {
                Err(IntakeError::InvalidFormat(
                    "Delimited text contains binary control bytes".into(),
                ))
            } else {
                Ok(kind)
            }
        }
    }
}

/// C0 control bytes other than tab/newline/carriage-return.
fn is_binary_control(byte: u8) -> bool {
    byte < 0x20 && !matches!(byte, b'\t' | b'\n' | b'\r')
}

/// Picks the delimiter for a delimited file by counting candidates on the
/// header line.
pub fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header_end = bytes
        .iter()
        .position(|b| *b == b'\n')
        .unwrap_or(bytes.len());
    let header = &bytes[..header_end];

    [b';', b'\t', b',']
        .into_iter()
        .max_by_key(|d| header.iter().filter(|b| *b == d).count())
        .filter(|d| header.contains(d))
        .unwrap_or(b',')
}
