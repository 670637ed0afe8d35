//! Telegram launch-context adapter.
//!
//! Translates the Mini App `initData` payload into the core launch context.
//! With a bot token available the payload signature is verified first; without
//! one the payload is trusted as-is, matching what an in-client app sees.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use newsroom_core::{
    domain::{LaunchContext, LaunchUser},
    Error, Result,
};

type HmacSha256 = Hmac<Sha256>;

/// Parse a raw `initData` query string into a launch context.
///
/// A missing or malformed payload is a recoverable `Error::Auth`, never a
/// panic: the caller renders a fallback instead of crashing.
pub fn parse_init_data(raw: &str, bot_token: Option<&str>) -> Result<LaunchContext> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.trim().as_bytes())
        .into_owned()
        .collect();
    if pairs.is_empty() {
        return Err(Error::Auth("empty launch payload".to_string()));
    }

    if let Some(token) = bot_token {
        verify(&pairs, token)?;
    }

    let mut ctx = LaunchContext::default();
    for (key, value) in &pairs {
        match key.as_str() {
            "user" => {
                let user: LaunchUser = serde_json::from_str(value)
                    .map_err(|e| Error::Auth(format!("malformed user payload: {e}")))?;
                ctx.user = Some(user);
            }
            "platform" | "tgWebAppPlatform" => ctx.platform = Some(value.clone()),
            "theme_params" | "tgWebAppThemeParams" => ctx.dark_theme = looks_dark(value),
            _ => {}
        }
    }
    Ok(ctx)
}

/// Theme hint: a dark background color in the theme params.
fn looks_dark(theme_params: &str) -> bool {
    let Ok(params) = serde_json::from_str::<serde_json::Value>(theme_params) else {
        return false;
    };
    let Some(bg) = params.get("bg_color").and_then(|v| v.as_str()) else {
        return false;
    };
    let Some(rgb) = parse_hex_color(bg) else {
        return false;
    };
    // Rec. 601 luma.
    let (r, g, b) = (rgb.0 as u32, rgb.1 as u32, rgb.2 as u32);
    (299 * r + 587 * g + 114 * b) / 1000 < 128
}

fn parse_hex_color(s: &str) -> Option<(u8, u8, u8)> {
    let s = s.strip_prefix('#')?;
    if s.len() != 6 {
        return None;
    }
    let bytes = hex::decode(s).ok()?;
    Some((bytes[0], bytes[1], bytes[2]))
}

/// Verify the payload hash per the Telegram Mini App algorithm:
/// `hash = hex(HMAC_SHA256(secret, data_check_string))` with
/// `secret = HMAC_SHA256(key = "WebAppData", msg = bot_token)`.
fn verify(pairs: &[(String, String)], bot_token: &str) -> Result<()> {
    let Some(hash) = pairs
        .iter()
        .find(|(k, _)| k == "hash")
        .map(|(_, v)| v.as_str())
    else {
        return Err(Error::Auth("launch payload carries no hash".to_string()));
    };

    let expected = expected_hash(&data_check_string(pairs), bot_token);
    if hash != expected {
        return Err(Error::Auth("launch payload hash mismatch".to_string()));
    }
    Ok(())
}

/// All fields except `hash`, sorted by key, joined as `key=value` lines.
fn data_check_string(pairs: &[(String, String)]) -> String {
    let mut fields: Vec<&(String, String)> = pairs.iter().filter(|(k, _)| k != "hash").collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn expected_hash(data_check: &str, bot_token: &str) -> String {
    let mut secret = HmacSha256::new_from_slice(b"WebAppData").expect("hmac accepts any key size");
    secret.update(bot_token.as_bytes());
    let secret = secret.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret).expect("hmac accepts any key size");
    mac.update(data_check.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
