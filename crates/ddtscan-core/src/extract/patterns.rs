//! Fixed regex patterns for DDT page extraction and document naming.
//!
//! The field patterns are written against the page-text conventions of
//! the source documents: literal CRLF line breaks and tab characters.
//! The text source guarantees those conventions (see `pdf::source`).

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Labeled number/genre/date triplet: "Num. D.D.T. 1.145/TA Data D.D.T. 10/03/2024 Pag"
    pub static ref DOC_NUMBER: Regex = Regex::new(
        r"Num\. D\.D\.T\. ([\d\.]+)/(\w{2}) Data D\.D\.T\. (\d{2}/\d{2}/\d{4}) Pag"
    ).unwrap();

    // Company + city in the right-hand delivery block.
    pub static ref CITY_DX: Regex = Regex::new(
        r"Luogo di consegna\r\n([\w\t .&'/()-]+)\r\n.+\r\n(?:\d{0,5}) ?([\w\t '.-]+) \(?(?:\w{2})\)?\r\nTelefono"
    ).unwrap();

    // Fallback: company + city in the left-hand departure block.
    pub static ref CITY_SX: Regex = Regex::new(
        r"Luogo di partenza: .+\r\n([\w\t .&'/-]+)\r\n(?:\d{5}) ([\w\t '.-]+) \(?(?:\w{2})\)?\r\n"
    ).unwrap();

    // Liters/kilograms quantity with thousands separators.
    pub static ref QUANTITY: Regex = Regex::new(
        r"(?:Quantità Prezzo\r\n.+)? (?:L|KG) ([\d\.]+),000\s"
    ).unwrap();

    // 7-character plate token plus optional driver name token.
    pub static ref VEHICLE: Regex = Regex::new(
        r"Peso soggetto accisa\r\n([\w\d]{7})\r\n([\w ]+)?\r?\n?Targa automezzo"
    ).unwrap();

    // Incoming document naming convention: 2024_01_DDT_0001_0100.pdf,
    // optionally with one or more _Pnnn isolation suffixes.
    pub static ref WORKING_DOC: Regex = Regex::new(
        r"^\d{4}_\d{2}_DDT_\d{4}_\d{4}(?:_P\d{3})*\.pdf$"
    ).unwrap();

    // Already-isolated page: captures the base document name and the
    // first isolated page number.
    pub static ref DISCARD_DOC: Regex = Regex::new(
        r"^(\d{4}_\d{2}_DDT_\d{4}_\d{4})_P(\d{3})(?:_P\d{3})*\.pdf$"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn doc_number_pattern() {
        let caps = DOC_NUMBER
            .captures("Num. D.D.T. 1.145/ta Data D.D.T. 10/03/2024 Pag. 1")
            .unwrap();
        assert_eq!(&caps[1], "1.145");
        assert_eq!(&caps[2], "ta");
        assert_eq!(&caps[3], "10/03/2024");
    }

    #[test]
    fn working_doc_names() {
        assert!(WORKING_DOC.is_match("2024_01_DDT_0001_0100.pdf"));
        assert!(WORKING_DOC.is_match("2024_01_DDT_0001_0100_P003.pdf"));
        assert!(WORKING_DOC.is_match("2024_01_DDT_0001_0100_P003_P001.pdf"));
        assert!(!WORKING_DOC.is_match("2024_01_DDT_0001_0100.recording.pdf"));
        assert!(!WORKING_DOC.is_match("invoice.pdf"));
    }

    #[test]
    fn discard_doc_captures_base_and_page() {
        let caps = DISCARD_DOC
            .captures("2024_01_DDT_0001_0100_P012.pdf")
            .unwrap();
        assert_eq!(&caps[1], "2024_01_DDT_0001_0100");
        assert_eq!(&caps[2], "012");

        // Re-isolated discard: the first suffix still identifies the page.
        let caps = DISCARD_DOC
            .captures("2024_01_DDT_0001_0100_P012_P001.pdf")
            .unwrap();
        assert_eq!(&caps[2], "012");

        assert!(!DISCARD_DOC.is_match("2024_01_DDT_0001_0100.pdf"));
    }
}
