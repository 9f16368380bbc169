//utils.rs
use chrono::{Datelike, Duration, Local, NaiveDate};

/// Format timestamp yang dipakai seragam di kolom audit.
pub fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn is_digits(s: &str, min: usize, max: usize) -> bool {
    let len = s.chars().count();
    len >= min && len <= max && s.chars().all(|c| c.is_ascii_digit())
}

/// Nama orang/tempat: huruf dan spasi saja.
pub fn is_valid_name(s: &str, min: usize, max: usize) -> bool {
    let trimmed = s.trim();
    let len = trimmed.chars().count();
    len >= min
        && len <= max
        && trimmed.chars().all(|c| c.is_alphabetic() || c == ' ')
}

pub fn is_valid_email(s: &str) -> bool {
    let s = s.trim();
    let mut parts = s.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = match parts.next() {
        Some(d) => d,
        None => return false,
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    let mut labels = domain.split('.');
    let has_dot = domain.contains('.');
    has_dot
        && labels.all(|l| {
            !l.is_empty() && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Nomor HP Indonesia: 08xxxxxxxxxx atau +628xxxxxxxxx, 10-13 digit total.
pub fn is_valid_phone(s: &str) -> bool {
    let digits: String = if let Some(rest) = s.strip_prefix("+62") {
        if !rest.starts_with('8') {
            return false;
        }
        format!("0{}", rest)
    } else if s.starts_with("08") {
        s.to_string()
    } else {
        return false;
    };

    is_digits(&digits, 10, 13)
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Tanggal lahir balita: tidak boleh di masa depan dan umur harus di
/// bawah 5 tahun (tepat 5 tahun sudah ditolak).
pub fn validate_birth_date(s: &str) -> Result<NaiveDate, String> {
    let date = parse_date(s).ok_or_else(|| "Invalid date format. Use YYYY-MM-DD".to_string())?;
    let today = Local::now().date_naive();

    if date > today {
        return Err("Birth date cannot be in the future".to_string());
    }

    let five_years_ago = shift_years(today, -5);
    if date <= five_years_ago {
        return Err("Balita must be under 5 years old".to_string());
    }

    Ok(date)
}

/// Tanggal laporan masyarakat: tidak boleh di masa depan dan maksimal
/// satu tahun ke belakang.
pub fn validate_report_date(s: &str) -> Result<NaiveDate, String> {
    let date = parse_date(s).ok_or_else(|| "Invalid date format. Use YYYY-MM-DD".to_string())?;
    let today = Local::now().date_naive();

    if date > today {
        return Err("Report date cannot be in the future".to_string());
    }
    if date < shift_years(today, -1) {
        return Err("Report date cannot be more than 1 year ago".to_string());
    }

    Ok(date)
}

fn shift_years(date: NaiveDate, years: i32) -> NaiveDate {
    let target_year = date.year() + years;
    NaiveDate::from_ymd_opt(target_year, date.month(), date.day())
        // 29 Februari pada tahun non-kabisat
        .unwrap_or_else(|| {
            NaiveDate::from_ymd_opt(target_year, date.month(), 28)
                .unwrap_or(date - Duration::days(365 * years.unsigned_abs() as i64))
        })
}

pub fn age_in_months(birth: NaiveDate, reference: NaiveDate) -> i32 {
    let mut months = (reference.year() - birth.year()) * 12 + reference.month() as i32
        - birth.month() as i32;
    if reference.day() < birth.day() {
        months -= 1;
    }
    months.max(0)
}

/// "2 tahun 3 bulan", "7 bulan" kalau di bawah setahun.
pub fn format_age(birth: NaiveDate, reference: NaiveDate) -> String {
    let months = age_in_months(birth, reference);
    let years = months / 12;
    let rest = months % 12;
    if years > 0 {
        format!("{} tahun {} bulan", years, rest)
    } else {
        format!("{} bulan", rest)
    }
}

/// Warna penanda balita pada peta. Status gizi menang atas status
/// laporan terakhir.
pub fn balita_point_color(status_gizi: Option<&str>, status_laporan: Option<&str>) -> &'static str {
    match status_gizi {
        Some("gizi buruk") => return "#FF0000",
        Some("stunting") => return "#FF6600",
        Some("normal") => return "#00AA00",
        _ => {}
    }

    match status_laporan {
        Some("Belum diproses") => "#FFFF00",
        Some("Diproses dan data tidak sesuai") => "#808080",
        Some("Diproses dan data sesuai") => "#0066FF",
        Some("Belum ditindaklanjuti") => "#FF9900",
        Some("Sudah ditindaklanjuti") => "#00CCCC",
        Some("Sudah perbaikan gizi") => "#00FF00",
        Some("Tidak ada laporan") | None => "#CCCCCC",
        Some(_) => "#999999",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_length_bounds() {
        assert!(is_digits("3175094006120001", 16, 16));
        assert!(!is_digits("317509400612000", 16, 16));
        assert!(!is_digits("31750940061200ab", 16, 16));
    }

    #[test]
    fn names_reject_symbols() {
        assert!(is_valid_name("Siti Rahayu", 3, 100));
        assert!(!is_valid_name("R2D2", 3, 100));
        assert!(!is_valid_name("Al", 3, 100));
    }

    #[test]
    fn phone_accepts_both_prefixes() {
        assert!(is_valid_phone("081234567890"));
        assert!(is_valid_phone("+6281234567890"));
        assert!(!is_valid_phone("621234567890"));
        assert!(!is_valid_phone("0812345"));
    }

    #[test]
    fn email_needs_domain_dot() {
        assert!(is_valid_email("warga@example.com"));
        assert!(!is_valid_email("warga@localhost"));
        assert!(!is_valid_email("example.com"));
    }

    #[test]
    fn birth_date_rules() {
        let today = Local::now().date_naive();
        let tomorrow = today + Duration::days(1);
        assert!(validate_birth_date(&tomorrow.format("%Y-%m-%d").to_string()).is_err());

        let recent = today - Duration::days(400);
        assert!(validate_birth_date(&recent.format("%Y-%m-%d").to_string()).is_ok());

        let too_old = today - Duration::days(6 * 365);
        assert!(validate_birth_date(&too_old.format("%Y-%m-%d").to_string()).is_err());

        // tepat 5 tahun ditolak, sehari setelahnya (4 tahun 364 hari) lolos
        let boundary = shift_years(today, -5);
        assert!(validate_birth_date(&boundary.format("%Y-%m-%d").to_string()).is_err());

        let just_under = boundary + Duration::days(1);
        assert!(validate_birth_date(&just_under.format("%Y-%m-%d").to_string()).is_ok());
    }

    #[test]
    fn report_date_window() {
        let today = Local::now().date_naive();
        assert!(validate_report_date(&today.format("%Y-%m-%d").to_string()).is_ok());

        let stale = today - Duration::days(400);
        assert!(validate_report_date(&stale.format("%Y-%m-%d").to_string()).is_err());
    }

    #[test]
    fn ages_in_indonesian() {
        let birth = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        let reference = NaiveDate::from_ymd_opt(2025, 4, 20).unwrap();
        assert_eq!(age_in_months(birth, reference), 27);
        assert_eq!(format_age(birth, reference), "2 tahun 3 bulan");

        let infant = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(format_age(infant, reference), "3 bulan");
    }

    #[test]
    fn point_colors_prefer_status_gizi() {
        assert_eq!(balita_point_color(Some("stunting"), Some("Belum diproses")), "#FF6600");
        assert_eq!(balita_point_color(None, Some("Belum diproses")), "#FFFF00");
        assert_eq!(balita_point_color(None, None), "#CCCCCC");
    }
}
