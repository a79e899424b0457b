use super::domain::RawRecord;

const SNIFF_WINDOW: usize = 1024;
const CONTROL_BYTE_LIMIT: f64 = 0.30;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("file appears to be binary, not tabular text")]
    BinaryContent,
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Buffered parse of an uploaded runlist into raw rows. Any malformed row
/// fails the whole file; no partial row set survives a broken parse.
pub fn parse_rows(bytes: &[u8]) -> Result<Vec<RawRecord>, ParseError> {
    if looks_binary(bytes) {
        return Err(ParseError::BinaryContent);
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        let row = RawRecord::from_pairs(
            headers
                .iter()
                .zip(record.iter())
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );
        rows.push(row);
    }

    Ok(rows)
}

/// Control-byte heuristic over an initial sample. A NUL is decisive; other
/// control bytes (tab, CR, LF excluded) count toward a density limit.
fn looks_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    if sample.is_empty() {
        return false;
    }

    let mut control = 0usize;
    for &byte in sample {
        if byte == 0 {
            return true;
        }
        if (byte < 0x20 && !matches!(byte, b'\t' | b'\r' | b'\n')) || byte == 0x7f {
            control += 1;
        }
    }

    (control as f64 / sample.len() as f64) > CONTROL_BYTE_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_rows() {
        let csv = "VIN,Make,Model\n1HGCM82633A004352,Honda,Accord\n";
        let rows = parse_rows(csv.as_bytes()).expect("parse succeeds");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cell("VIN"), Some("1HGCM82633A004352"));
        assert_eq!(rows[0].cell("make"), Some("Honda"));
    }

    #[test]
    fn rejects_content_with_nul_bytes() {
        let bytes = b"VIN,Make\n\x001HG,Honda\n";
        assert!(matches!(
            parse_rows(bytes),
            Err(ParseError::BinaryContent)
        ));
    }

    #[test]
    fn rejects_control_heavy_content() {
        let mut bytes = vec![0x01u8; 600];
        bytes.extend_from_slice(b"VIN,Make\n");
        assert!(matches!(
            parse_rows(&bytes),
            Err(ParseError::BinaryContent)
        ));
    }

    #[test]
    fn tolerates_short_rows() {
        let csv = "VIN,Make,Model\n1HGCM82633A004352,Honda\n";
        let rows = parse_rows(csv.as_bytes()).expect("flexible parse succeeds");
        assert_eq!(rows[0].cell("Model"), None);
    }

    #[test]
    fn malformed_row_fails_the_whole_file() {
        // Invalid UTF-8 mid-file, past the sniff window's reach.
        let mut bytes = b"VIN,Make\n1HGCM82633A004352,Honda\n".to_vec();
        bytes.extend_from_slice(&[0xFF, 0xFE]);
        bytes.extend_from_slice(b",Ford\n");
        assert!(matches!(parse_rows(&bytes), Err(ParseError::Csv(_))));
    }

    #[test]
    fn empty_input_parses_to_no_rows() {
        let rows = parse_rows(b"").expect("empty input is not binary");
        assert!(rows.is_empty());
    }
}
