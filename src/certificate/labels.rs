use chrono::{Datelike, NaiveDate};
use std::str::FromStr;

/// Language of the printed certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" | "es-es" | "es_es" => Ok(Locale::Es),
            "en" | "en-us" | "en_us" | "en-gb" => Ok(Locale::En),
            other => Err(format!("unsupported locale '{}'", other)),
        }
    }
}

/// Fixed strings printed on a certificate page.
#[derive(Debug)]
pub struct Labels {
    pub title: &'static str,
    pub statement: &'static str,
    pub order: &'static str,
    pub code: &'static str,
    pub sku: &'static str,
    pub unit: &'static str,
    pub of: &'static str,
    pub holder: &'static str,
    pub issued: &'static str,
    pub untitled: &'static str,
    pub image_unavailable: &'static str,
    pub qr_unavailable: &'static str,
    pub signature_unavailable: &'static str,
    pub header_unavailable: &'static str,
    pub footer_unavailable: &'static str,
    pub art_direction: &'static str,
    pub curation: &'static str,
    pub filename_prefix: &'static str,
    months: [&'static str; 12],
    day_first: bool,
}

const ES: Labels = Labels {
    title: "CERTIFICADO DE AUTENTICIDAD",
    statement: "Se certifica la autenticidad de:",
    order: "Orden",
    code: "Código",
    sku: "SKU",
    unit: "Unidad",
    of: "de",
    holder: "A nombre de",
    issued: "Fecha de emisión",
    untitled: "Producto sin título",
    image_unavailable: "Imagen no disponible",
    qr_unavailable: "Código QR no disponible",
    signature_unavailable: "Firma no disponible",
    header_unavailable: "Encabezado no disponible",
    footer_unavailable: "Pie de página no disponible",
    art_direction: "Dirección de Arte",
    curation: "Curaduría",
    filename_prefix: "Certificado",
    months: [
        "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto",
        "septiembre", "octubre", "noviembre", "diciembre",
    ],
    day_first: true,
};

const EN: Labels = Labels {
    title: "CERTIFICATE OF AUTHENTICITY",
    statement: "This certifies the authenticity of:",
    order: "Order",
    code: "Code",
    sku: "SKU",
    unit: "Unit",
    of: "of",
    holder: "Issued to",
    issued: "Date of issue",
    untitled: "Untitled product",
    image_unavailable: "Image unavailable",
    qr_unavailable: "QR code unavailable",
    signature_unavailable: "Signature unavailable",
    header_unavailable: "Header unavailable",
    footer_unavailable: "Footer unavailable",
    art_direction: "Art Direction",
    curation: "Curation",
    filename_prefix: "Certificate",
    months: [
        "January", "February", "March", "April", "May", "June", "July", "August",
        "September", "October", "November", "December",
    ],
    day_first: false,
};

impl Locale {
    pub fn labels(self) -> &'static Labels {
        match self {
            Locale::Es => &ES,
            Locale::En => &EN,
        }
    }
}

impl Labels {
    /// Long-form date, `14 de octubre de 2026` or `October 14, 2026`.
    pub fn format_date(&self, date: NaiveDate) -> String {
        let month = self.months[date.month0() as usize];
        if self.day_first {
            format!("{} de {} de {}", date.day(), month, date.year())
        } else {
            format!("{} {}, {}", month, date.day(), date.year())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locale_names() {
        assert_eq!("ES".parse::<Locale>(), Ok(Locale::Es));
        assert_eq!(" en-US ".parse::<Locale>(), Ok(Locale::En));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn formats_dates_per_locale() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        assert_eq!(Locale::Es.labels().format_date(date), "14 de octubre de 2026");
        assert_eq!(Locale::En.labels().format_date(date), "October 14, 2026");
    }
}
