use super::super::domain::CanonicalField;

/// Ordered header synonyms tried when no explicit mapping exists. Only the
/// fields needed to anchor a row (VIN) and to locate the vehicle on the lot
/// (lane, run) are guessed; everything else stays unmapped.
const HEADER_SYNONYMS: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::Vin,
        &[
            "vin",
            "vin #",
            "vin number",
            "vehicle identification number",
            "vehicle id",
            "serial",
            "serial number",
        ],
    ),
    (
        CanonicalField::Lane,
        &["lane", "lane #", "lane number", "lane no", "ln"],
    ),
    (
        CanonicalField::Run,
        &["run", "run #", "run number", "run no", "run order"],
    ),
];

/// Pick the first header matching a synonym for `field`, in priority order.
/// Comparison is case-insensitive on trimmed names; the original header is
/// returned so callers can read the row verbatim.
pub(crate) fn guess_column<'a>(field: CanonicalField, headers: &[&'a str]) -> Option<&'a str> {
    let synonyms = HEADER_SYNONYMS
        .iter()
        .find(|(candidate, _)| *candidate == field)
        .map(|(_, synonyms)| *synonyms)?;

    for synonym in synonyms {
        let found = headers
            .iter()
            .copied()
            .find(|header| header.trim().eq_ignore_ascii_case(synonym));
        if found.is_some() {
            return found;
        }
    }

    None
}

/// Fields the heuristic table knows how to guess.
pub(crate) fn guessable_fields() -> impl Iterator<Item = CanonicalField> {
    HEADER_SYNONYMS.iter().map(|(field, _)| *field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_synonym_match_wins() {
        let headers = ["Serial Number", "VIN #", "Lane"];
        assert_eq!(
            guess_column(CanonicalField::Vin, &headers),
            Some("VIN #"),
            "'vin #' outranks 'serial number' in the priority list"
        );
    }

    #[test]
    fn matching_ignores_case_and_padding() {
        let headers = [" vin number ", "LANE NO"];
        assert_eq!(
            guess_column(CanonicalField::Vin, &headers),
            Some(" vin number ")
        );
        assert_eq!(guess_column(CanonicalField::Lane, &headers), Some("LANE NO"));
    }

    #[test]
    fn unknown_fields_are_never_guessed() {
        let headers = ["Make", "Model", "Year"];
        assert_eq!(guess_column(CanonicalField::Make, &headers), None);
        assert_eq!(guess_column(CanonicalField::Model, &headers), None);
    }

    #[test]
    fn no_match_yields_none() {
        let headers = ["Manufacturer", "Body"];
        assert_eq!(guess_column(CanonicalField::Vin, &headers), None);
    }
}
