use axum::http::HeaderValue;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// `Set-Cookie` value for an auth token: HttpOnly, SameSite=Lax, Secure over HTTPS
pub fn auth_cookie(name: &str, token: &str, max_age_secs: i64, secure: bool) -> HeaderValue {
    let secure = if secure { "; Secure" } else { "" };
    let cookie = format!("{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}{secure}");
    // JWTs are base64url + dots, always a valid header value
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Expires the cookie immediately
pub fn clear_cookie(name: &str, secure: bool) -> HeaderValue {
    auth_cookie(name, "", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_cookie_attributes() {
        let cookie = auth_cookie(ACCESS_COOKIE, "abc.def.ghi", 900, true);
        let value = cookie.to_str().unwrap();
        assert!(value.starts_with("access_token=abc.def.ghi;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=900"));
        assert!(value.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie_has_zero_max_age() {
        let value = clear_cookie(REFRESH_COOKIE, false);
        assert_eq!(
            value.to_str().unwrap(),
            "refresh_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }
}
