// src/core/scanner/fingerprint_scanner.rs

use tracing::debug;
use reqwest::header::HeaderMap;
use regex::Regex;
use once_cell::sync::Lazy;

/// Defines the different places a technology signature can be found in a HEAD response.
enum Check<'a> {
    /// Check for a pattern in a specific HTTP header.
    Header(&'a str, &'a Lazy<Regex>),
    /// Check only that a header is present.
    HeaderPresent(&'a str),
    /// Check for a pattern in the `set-cookie` headers.
    Cookie(&'a Lazy<Regex>),
}

/// A rule that defines how to detect a specific technology.
struct FingerprintRule<'a> {
    tech_name: &'a str,
    category: &'a str,
    check: Check<'a>,
}

// `Server` and `X-Powered-By` are reported verbatim by the headers scan, so the rules
// below only look at what those two headers do not already say.
static RE_ASPNET: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d\.]+)").unwrap());
static RE_DRUPAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Drupal ?([\d\.]+)?").unwrap());
static RE_GENERATOR_WORDPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"WordPress ?([\d\.]+)?").unwrap());
static RE_VARNISH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)varnish").unwrap());
static RE_SQUID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)squid(?:/([\d\.]+))?").unwrap());
static RE_CLOUDFRONT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)cloudfront").unwrap());
static RE_PHPSESSID: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHPSESSID").unwrap());
static RE_JSESSIONID: Lazy<Regex> = Lazy::new(|| Regex::new(r"JSESSIONID").unwrap());
static RE_ASPNET_SESSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"ASP\.NET_SessionId").unwrap());
static RE_DJANGO_CSRF: Lazy<Regex> = Lazy::new(|| Regex::new(r"csrftoken").unwrap());
static RE_RUBY_RAILS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_rails_session").unwrap());
static RE_LARAVEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"laravel_session").unwrap());
static RE_MAGENTO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)magento").unwrap());
static RE_CLOUDFLARE_COOKIE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__cf_bm|__cfduid").unwrap());

/// The master list of header-based fingerprinting rules.
static RULES: &[FingerprintRule] = &[
    FingerprintRule { tech_name: "Cloudflare", category: "CDN / WAF", check: Check::HeaderPresent("cf-ray") },
    FingerprintRule { tech_name: "Cloudflare", category: "CDN / WAF", check: Check::Cookie(&RE_CLOUDFLARE_COOKIE) },
    FingerprintRule { tech_name: "Amazon CloudFront", category: "CDN / WAF", check: Check::Header("via", &RE_CLOUDFRONT) },
    FingerprintRule { tech_name: "Amazon CloudFront", category: "CDN / WAF", check: Check::HeaderPresent("x-amz-cf-id") },
    FingerprintRule { tech_name: "Fastly", category: "CDN / WAF", check: Check::HeaderPresent("x-fastly-request-id") },
    FingerprintRule { tech_name: "Akamai", category: "CDN / WAF", check: Check::HeaderPresent("x-akamai-transformed") },
    FingerprintRule { tech_name: "Sucuri", category: "CDN / WAF", check: Check::HeaderPresent("x-sucuri-id") },
    FingerprintRule { tech_name: "Varnish", category: "Cache", check: Check::Header("via", &RE_VARNISH) },
    FingerprintRule { tech_name: "Varnish", category: "Cache", check: Check::HeaderPresent("x-varnish") },
    FingerprintRule { tech_name: "Squid", category: "Cache", check: Check::Header("via", &RE_SQUID) },
    FingerprintRule { tech_name: "ASP.NET", category: "Framework", check: Check::Header("x-aspnet-version", &RE_ASPNET) },
    FingerprintRule { tech_name: "ASP.NET MVC", category: "Framework", check: Check::Header("x-aspnetmvc-version", &RE_ASPNET) },
    FingerprintRule { tech_name: "ASP.NET", category: "Framework", check: Check::Cookie(&RE_ASPNET_SESSION) },
    FingerprintRule { tech_name: "Drupal", category: "CMS", check: Check::Header("x-generator", &RE_DRUPAL) },
    FingerprintRule { tech_name: "Drupal", category: "CMS", check: Check::HeaderPresent("x-drupal-cache") },
    FingerprintRule { tech_name: "WordPress", category: "CMS", check: Check::Header("x-generator", &RE_GENERATOR_WORDPRESS) },
    FingerprintRule { tech_name: "Shopify", category: "E-commerce", check: Check::HeaderPresent("x-shopid") },
    FingerprintRule { tech_name: "Magento", category: "E-commerce", check: Check::Cookie(&RE_MAGENTO) },
    FingerprintRule { tech_name: "PHP", category: "Language", check: Check::Cookie(&RE_PHPSESSID) },
    FingerprintRule { tech_name: "Java", category: "Language", check: Check::Cookie(&RE_JSESSIONID) },
    FingerprintRule { tech_name: "Python/Django", category: "Framework", check: Check::Cookie(&RE_DJANGO_CSRF) },
    FingerprintRule { tech_name: "Ruby on Rails", category: "Framework", check: Check::Cookie(&RE_RUBY_RAILS) },
    FingerprintRule { tech_name: "Laravel", category: "Framework", check: Check::Cookie(&RE_LARAVEL) },
];

/// Applies every rule to the response headers and returns `"Category: Name [version]"`
/// labels, in rule order, one per technology.
pub fn detect_technologies(headers: &HeaderMap) -> Vec<String> {
    let cookies = headers
        .get_all("set-cookie")
        .into_iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    let mut found: Vec<(&str, &str, Option<String>)> = Vec::new();

    debug!(total_rules = %RULES.len(), "Applying fingerprinting rules.");
    for rule in RULES {
        let version = match &rule.check {
            Check::Header(name, re) => check_with_regex(headers.get(*name).and_then(|v| v.to_str().ok()), re),
            Check::HeaderPresent(name) => headers.contains_key(*name).then_some(None),
            Check::Cookie(re) => check_with_regex(Some(&cookies), re),
        };

        if let Some(v) = version {
            debug!(tech = %rule.tech_name, version = ?v, "Rule matched.");
            match found.iter_mut().find(|(name, _, _)| *name == rule.tech_name) {
                Some(existing) => {
                    if existing.2.is_none() {
                        existing.2 = v;
                    }
                }
                None => found.push((rule.tech_name, rule.category, v)),
            }
        }
    }

    found
        .into_iter()
        .map(|(name, category, version)| match version {
            Some(v) => format!("{category}: {name} {v}"),
            None => format!("{category}: {name}"),
        })
        .collect()
}

/// Applies a regex to an optional string slice.
///
/// `Some(Some(version))` if the pattern matched with a captured version,
/// `Some(None)` if it matched without one, and `None` if it did not match.
fn check_with_regex(text_option: Option<&str>, re: &Regex) -> Option<Option<String>> {
    text_option.and_then(|text| {
        re.captures(text).map(|caps| {
            caps.get(1)
                .map(|m| m.as_str().to_string())
                .filter(|s| !s.is_empty())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn no_signatures_no_labels() {
        assert!(detect_technologies(&headers(&[("content-type", "text/html")])).is_empty());
    }

    #[test]
    fn detects_cdn_and_session_cookies() {
        let map = headers(&[
            ("cf-ray", "7d1c2b3a4e5f-AMS"),
            ("set-cookie", "PHPSESSID=abc; path=/"),
            ("set-cookie", "csrftoken=xyz"),
        ]);
        assert_eq!(
            detect_technologies(&map),
            vec!["CDN / WAF: Cloudflare", "Language: PHP", "Framework: Python/Django"]
        );
    }

    #[test]
    fn captures_versions_and_merges_duplicate_rules() {
        let map = headers(&[("x-aspnet-version", "4.0.30319"), ("set-cookie", "ASP.NET_SessionId=1")]);
        assert_eq!(detect_technologies(&map), vec!["Framework: ASP.NET 4.0.30319"]);
    }

    #[test]
    fn via_header_identifies_caches() {
        let map = headers(&[("via", "1.1 varnish (Varnish/6.0)")]);
        assert_eq!(detect_technologies(&map), vec!["Cache: Varnish"]);
    }
}
