//! Best-effort device and browser detection from the User-Agent header.
//!
//! Both detectors are ordered rule tables evaluated first-match-wins, so a
//! brand rule placed before the generic Android rule takes precedence.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::record::UNKNOWN_DEVICE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    Windows,
    MacOs,
    Linux,
    Unknown,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Android => "Android",
            Platform::Ios => "iOS",
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
            Platform::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Result of device classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceClass {
    pub platform: Platform,
    /// OS version when the user-agent exposes one (e.g. `13`, `17.4`)
    pub version: Option<String>,
    /// Human-readable label stored with the visitor record
    pub label: String,
}

impl DeviceClass {
    fn unknown() -> Self {
        Self {
            platform: Platform::Unknown,
            version: None,
            label: UNKNOWN_DEVICE.to_string(),
        }
    }
}

enum Matcher {
    /// Any of the keywords appears in the lower-cased user-agent
    Keywords(&'static [&'static str]),
    /// `android <version>`
    AndroidVersion,
}

struct DeviceRule {
    matcher: Matcher,
    platform: Platform,
    name: &'static str,
}

const fn keywords(list: &'static [&'static str], platform: Platform, name: &'static str) -> DeviceRule {
    DeviceRule {
        matcher: Matcher::Keywords(list),
        platform,
        name,
    }
}

/// Order matters: handset brands, then generic Android, then desktop/iOS platforms
const DEVICE_RULES: &[DeviceRule] = &[
    keywords(&["samsung", "sm-"], Platform::Android, "Samsung"),
    keywords(&["redmi", "xiaomi", "poco"], Platform::Android, "Xiaomi"),
    keywords(&["huawei", "honor"], Platform::Android, "Huawei"),
    keywords(&["oneplus"], Platform::Android, "OnePlus"),
    keywords(&["oppo", "cph"], Platform::Android, "Oppo"),
    keywords(&["vivo"], Platform::Android, "Vivo"),
    keywords(&["realme", "rmx"], Platform::Android, "Realme"),
    keywords(&["motorola", "moto "], Platform::Android, "Motorola"),
    keywords(&["pixel"], Platform::Android, "Google Pixel"),
    DeviceRule {
        matcher: Matcher::AndroidVersion,
        platform: Platform::Android,
        name: "Android",
    },
    keywords(&["android"], Platform::Android, "Android"),
    keywords(&["iphone"], Platform::Ios, "iPhone"),
    keywords(&["ipad"], Platform::Ios, "iPad"),
    keywords(&["windows"], Platform::Windows, "Windows PC"),
    keywords(&["macintosh", "mac os x"], Platform::MacOs, "Mac"),
    keywords(&["cros "], Platform::Linux, "Chromebook"),
    keywords(&["linux", "x11"], Platform::Linux, "Linux PC"),
];

fn android_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"android[ /]?(\d+(?:\.\d+)*)").expect("android version pattern is valid")
    })
}

fn ios_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:iphone|cpu) os (\d+(?:_\d+)*)").expect("ios version pattern is valid")
    })
}

fn platform_version(platform: Platform, ua: &str) -> Option<String> {
    match platform {
        Platform::Android => android_version_re()
            .captures(ua)
            .map(|c| c[1].to_string()),
        Platform::Ios => ios_version_re()
            .captures(ua)
            .map(|c| c[1].replace('_', ".")),
        _ => None,
    }
}

/// Classify a raw user-agent string
pub fn classify_device(user_agent: &str) -> DeviceClass {
    let ua = user_agent.to_lowercase();

    for rule in DEVICE_RULES {
        let matched = match rule.matcher {
            Matcher::Keywords(list) => list.iter().any(|k| ua.contains(k)),
            Matcher::AndroidVersion => android_version_re().is_match(&ua),
        };
        if !matched {
            continue;
        }

        let version = platform_version(rule.platform, &ua);
        let label = match (&rule.matcher, &version) {
            (Matcher::AndroidVersion, Some(v)) => format!("Android {}", v),
            (Matcher::Keywords(_), Some(v)) => format!("{} ({} {})", rule.name, rule.platform, v),
            _ => rule.name.to_string(),
        };

        return DeviceClass {
            platform: rule.platform,
            version,
            label,
        };
    }

    DeviceClass::unknown()
}

struct BrowserRule {
    token: &'static str,
    name: &'static str,
}

/// Chromium derivatives carry `Chrome/` and `Safari/`, so they come first
const BROWSER_RULES: &[BrowserRule] = &[
    BrowserRule { token: "Edg/", name: "Edge" },
    BrowserRule { token: "OPR/", name: "Opera" },
    BrowserRule { token: "SamsungBrowser/", name: "Samsung Internet" },
    BrowserRule { token: "Firefox/", name: "Firefox" },
    BrowserRule { token: "FxiOS/", name: "Firefox" },
    BrowserRule { token: "CriOS/", name: "Chrome" },
    BrowserRule { token: "Chrome/", name: "Chrome" },
    BrowserRule { token: "Safari/", name: "Safari" },
];

/// Name of the browser family, if any rule matches
pub fn classify_browser(user_agent: &str) -> Option<&'static str> {
    BROWSER_RULES
        .iter()
        .find(|rule| user_agent.contains(rule.token))
        .map(|rule| rule.name)
}

/// Short summary shown for the current visit, e.g. `Android 13; Chrome`
pub fn summarize(device: &DeviceClass, browser: Option<&str>) -> String {
    let mut parts = Vec::new();
    if device.platform != Platform::Unknown {
        match &device.version {
            Some(v) => parts.push(format!("{} {}", device.platform, v)),
            None => parts.push(device.platform.to_string()),
        }
    }
    if let Some(browser) = browser {
        parts.push(browser.to_string());
    }

    if parts.is_empty() {
        "Unknown".to_string()
    } else {
        parts.join("; ")
    }
}
