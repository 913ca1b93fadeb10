use chrono::Utc;
use url::Url;

const RESERVED: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replace path separators and shell/filesystem reserved characters with `_`
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .collect()
}

/// `filename=` parameter of a Content-Disposition header, if usable
pub fn file_name_from_disposition(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("filename=")?;
    let value = rest.split(';').next().unwrap_or(rest).trim().trim_matches('"');

    usable(value).then(|| sanitize_file_name(value))
}

/// Last non-empty path segment of `url`, if usable
pub fn file_name_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    usable(segment).then(|| sanitize_file_name(segment))
}

/// Name used when neither header nor URL offer one
pub fn fallback_file_name() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("downloaded_file_{nanos}")
}

fn usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_reserved() {
        assert_eq!(sanitize_file_name(r#"a/b\c:d*e?f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_file_name("report 2024.pdf"), "report 2024.pdf");
    }

    #[test]
    fn test_disposition_quoted_and_bare() {
        assert_eq!(
            file_name_from_disposition(r#"attachment; filename="data.csv""#).as_deref(),
            Some("data.csv")
        );
        assert_eq!(
            file_name_from_disposition("attachment; filename=data.csv; size=10").as_deref(),
            Some("data.csv")
        );
    }

    #[test]
    fn test_disposition_without_filename() {
        assert_eq!(file_name_from_disposition("inline"), None);
        assert_eq!(file_name_from_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_disposition_is_sanitized() {
        assert_eq!(
            file_name_from_disposition(r#"attachment; filename="../../etc/passwd""#).as_deref(),
            Some(".._.._etc_passwd")
        );
    }

    #[test]
    fn test_url_last_segment() {
        let url = Url::parse("https://example.com/files/archive.tar.gz?x=1").unwrap();
        assert_eq!(file_name_from_url(&url).as_deref(), Some("archive.tar.gz"));

        let url = Url::parse("https://example.com/files/").unwrap();
        assert_eq!(file_name_from_url(&url).as_deref(), Some("files"));
    }

    #[test]
    fn test_url_without_path() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(file_name_from_url(&url), None);
    }

    #[test]
    fn test_fallback_name_prefix() {
        assert!(fallback_file_name().starts_with("downloaded_file_"));
    }
}
