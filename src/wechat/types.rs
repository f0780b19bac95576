use serde::Deserialize;

/// Body returned by `GET /cgi-bin/token`.
///
/// On success it carries `access_token` and `expires_in`; on failure WeChat
/// still answers 200 with `errcode` and `errmsg`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub errcode: Option<i64>,
    #[serde(default)]
    pub errmsg: Option<String>,
}

impl AccessTokenResponse {
    /// The error envelope, if the response carries a non-zero `errcode`.
    pub fn error(&self) -> Option<(i64, &str)> {
        match self.errcode {
            Some(code) if code != 0 => Some((code, self.errmsg.as_deref().unwrap_or(""))),
            _ => None,
        }
    }
}

/// A freshly issued token as reported by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in_secs: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body() {
        let resp: AccessTokenResponse =
            serde_json::from_str(r#"{"access_token":"ACCESS_TOKEN","expires_in":7200}"#).unwrap();
        assert_eq!(resp.access_token.as_deref(), Some("ACCESS_TOKEN"));
        assert_eq!(resp.expires_in, Some(7200));
        assert!(resp.error().is_none());
    }

    #[test]
    fn error_envelope() {
        let resp: AccessTokenResponse =
            serde_json::from_str(r#"{"errcode":40013,"errmsg":"invalid appid"}"#).unwrap();
        assert_eq!(resp.error(), Some((40013, "invalid appid")));
        assert!(resp.access_token.is_none());
    }

    #[test]
    fn zero_errcode_is_not_an_error() {
        let resp: AccessTokenResponse = serde_json::from_str(
            r#"{"errcode":0,"errmsg":"ok","access_token":"T","expires_in":7200}"#,
        )
        .unwrap();
        assert!(resp.error().is_none());
    }
}
