//! Built-in tracking tag signatures

/// Static description of one tag signature before its regexes are compiled
pub(crate) struct TagDefinition {
    pub name: &'static str,
    pub patterns: &'static [&'static str],
    pub urls: &'static [&'static str],
    pub category: &'static str,
}

const fn tag(
    name: &'static str,
    patterns: &'static [&'static str],
    urls: &'static [&'static str],
    category: &'static str,
) -> TagDefinition {
    TagDefinition {
        name,
        patterns,
        urls,
        category,
    }
}

pub(crate) const TAG_DEFINITIONS: &[TagDefinition] = &[
    // Google
    tag(
        "google_tag_manager",
        &[r"GTM-[A-Z0-9]{4,}"],
        &["googletagmanager.com/gtm.js", "googletagmanager.com/ns.html"],
        "Tag Management",
    ),
    tag(
        "google_analytics_4",
        &[r"G-[A-Z0-9]{10,}"],
        &["googletagmanager.com/gtag/js", "google-analytics.com/g/collect"],
        "Analytics",
    ),
    tag(
        "universal_analytics",
        &[r"UA-\d+-\d+"],
        &["google-analytics.com/analytics.js", "google-analytics.com/ga.js"],
        "Analytics",
    ),
    tag(
        "google_ads",
        &[r"AW-\d+"],
        &["googleadservices.com/pagead/conversion"],
        "Advertising",
    ),
    tag(
        "google_optimize",
        &[r"OPT-[A-Z0-9]{4,}"],
        &["www.googleoptimize.com/optimize.js"],
        "A/B Testing",
    ),
    // Meta
    tag(
        "facebook_pixel",
        &[r#"fbq\(['"]init['"]\s*,\s*['"](\d+)['"]"#],
        &["connect.facebook.net/en_US/fbevents.js"],
        "Advertising",
    ),
    tag(
        "facebook_capi",
        &[r"facebook\.com/tr"],
        &["graph.facebook.com"],
        "Server-Side Tracking",
    ),
    tag(
        "linkedin_insight",
        &[r#"_linkedin_partner_id\s*=\s*['"](\d+)['"]"#],
        &["snap.licdn.com/li.lms-analytics", "px.ads.linkedin.com"],
        "Advertising",
    ),
    tag(
        "tiktok_pixel",
        &[
            r#"ttq\.load\(['"]([A-Z0-9]+)['"]"#,
            r#"tiktok_pixel_code['"]?\s*:\s*['"]([A-Z0-9]+)['"]"#,
        ],
        &["analytics.tiktok.com/i18n/pixel/events.js"],
        "Advertising",
    ),
    tag(
        "twitter_pixel",
        &[r#"twq\(['"]init['"]"#],
        &["static.ads-twitter.com/uwt.js"],
        "Advertising",
    ),
    tag(
        "snapchat_pixel",
        &[r#"snaptr\(['"]init['"]"#],
        &["sc-static.net/scevent.min.js"],
        "Advertising",
    ),
    tag(
        "pinterest_tag",
        &[r#"pintrk\(['"]load['"]"#],
        &["s.pinimg.com/ct/core.js"],
        "Advertising",
    ),
    tag(
        "reddit_pixel",
        &[r#"rdt\(['"]init['"]"#],
        &["www.redditstatic.com/ads/pixel.js"],
        "Advertising",
    ),
    // Adobe
    tag(
        "adobe_analytics",
        &[r"s_account\s*=", r"var s=s_gi\("],
        &["omtrdc.net", "adobedtm.com"],
        "Analytics",
    ),
    tag(
        "adobe_launch",
        &[r"//assets\.adobedtm\.com/"],
        &["assets.adobedtm.com/launch"],
        "Tag Management",
    ),
    tag(
        "adobe_target",
        &[r"adobe\.target"],
        &["tt.omtrdc.net"],
        "A/B Testing",
    ),
    // Other tag managers
    tag("tealium", &[r"utag\.js"], &["tags.tiqcdn.com"], "Tag Management"),
    tag(
        "segment",
        &[r#"analytics\.load\(['"]([a-zA-Z0-9]+)['"]"#],
        &["cdn.segment.com/analytics.js"],
        "Customer Data Platform",
    ),
    // Analytics
    tag(
        "matomo",
        &[r"_paq\.push", r"Matomo\.getTracker"],
        &["matomo.js", "piwik.js"],
        "Analytics",
    ),
    tag(
        "mixpanel",
        &[r#"mixpanel\.init\(['"]([a-zA-Z0-9]+)['"]"#],
        &["cdn.mxpnl.com/libs/mixpanel"],
        "Analytics",
    ),
    tag(
        "heap",
        &[r#"heap\.load\(['"](\d+)['"]"#],
        &["cdn.heapanalytics.com"],
        "Analytics",
    ),
    tag(
        "amplitude",
        &[r#"amplitude\.getInstance\(\)\.init\(['"]([a-zA-Z0-9]+)['"]"#],
        &["cdn.amplitude.com"],
        "Analytics",
    ),
    tag(
        "kissmetrics",
        &[r"_kmq\.push"],
        &["i.kissmetrics.com"],
        "Analytics",
    ),
    tag(
        "clicky",
        &[r"clicky_site_ids\.push\((\d+)\)"],
        &["static.getclicky.com"],
        "Analytics",
    ),
    // Heatmaps and session recording
    tag(
        "hotjar",
        &[r"hjid:\s*(\d+)", r#"hj\(['"](hjid|identify)['"]"#],
        &["static.hotjar.com"],
        "Heatmaps",
    ),
    tag(
        "crazy_egg",
        &[r"crazyegg"],
        &["script.crazyegg.com"],
        "Heatmaps",
    ),
    tag("mouseflow", &[r"_mfq\.push"], &["cdn.mouseflow.com"], "Heatmaps"),
    tag(
        "fullstory",
        &[r"FS\.identify", r#"window\[['"]\s*_fs_"#],
        &["fullstory.com/s/fs.js"],
        "Session Recording",
    ),
    tag(
        "lucky_orange",
        &[r"_loq\.push", r"LOQ_"],
        &["d10lpsik1i8c69.cloudfront.net"],
        "Heatmaps",
    ),
    tag(
        "clarity",
        &[r#"clarity\(['"]set['"]"#],
        &["clarity.ms"],
        "Heatmaps",
    ),
    // A/B testing
    tag(
        "optimizely",
        &[r"optimizely"],
        &["cdn.optimizely.com"],
        "A/B Testing",
    ),
    tag(
        "vwo",
        &[r"_vwo_"],
        &["dev.visualwebsiteoptimizer.com"],
        "A/B Testing",
    ),
    tag("ab_tasty", &[r"ABTasty"], &["try.abtasty.com"], "A/B Testing"),
    // Consent management
    tag(
        "onetrust",
        &[r"OneTrust", r"optanon"],
        &["cdn.cookielaw.org"],
        "Consent Management",
    ),
    tag(
        "cookiebot",
        &[r"Cookiebot"],
        &["consent.cookiebot.com"],
        "Consent Management",
    ),
    tag(
        "trustarc",
        &[r"truste", r"TrustArc"],
        &["consent.trustarc.com"],
        "Consent Management",
    ),
    tag(
        "quantcast",
        &[r"quantserve\.com", r"__qca"],
        &["quantcast.mgr.consensu.org"],
        "Consent Management",
    ),
    // E-commerce
    tag(
        "shopify_analytics",
        &[r"Shopify\.analytics"],
        &["cdn.shopify.com/s/javascripts/tricorder"],
        "E-commerce",
    ),
    tag("criteo", &[r"criteo"], &["static.criteo.net"], "Retargeting"),
    // Marketing automation
    tag(
        "hubspot",
        &[r"_hsq\.push", r"portalId:\s*(\d+)"],
        &["js.hs-scripts.com", "js.hubspot.com"],
        "Marketing Automation",
    ),
    tag(
        "marketo",
        &[r#"Munchkin\.init\(['"]([0-9]+-[A-Z0-9-]+)['"]"#],
        &["munchkin.marketo.net"],
        "Marketing Automation",
    ),
    tag(
        "pardot",
        &[r"piTracker", r"pardot"],
        &["pi.pardot.com"],
        "Marketing Automation",
    ),
    // Customer support
    tag(
        "intercom",
        &[r#"Intercom\(['"]boot['"]"#, r#"app_id:\s*['"]([a-z0-9]+)['"]"#],
        &["widget.intercom.io"],
        "Customer Support",
    ),
    tag(
        "drift",
        &[r#"drift\.load\(['"]([a-z0-9]+)['"]"#],
        &["js.driftt.com"],
        "Customer Support",
    ),
    tag(
        "zendesk",
        &[r"zE\(function\(\)"],
        &["static.zdassets.com"],
        "Customer Support",
    ),
    // Other
    tag(
        "microsoft_clarity",
        &[r#"clarity\(['"]start['"]"#],
        &["www.clarity.ms"],
        "Analytics",
    ),
    tag("bing_ads", &[r"UET_TAG_ID"], &["bat.bing.com"], "Advertising"),
    tag(
        "yandex_metrica",
        &[r"ym\(\d+"],
        &["mc.yandex.ru/metrika"],
        "Analytics",
    ),
];

/// Collection hosts that receive beacons without appearing in any tag's
/// script URL
pub(crate) const COLLECTION_HOSTS: &[&str] = &[
    "google-analytics.com",
    "analytics.google.com",
    "googletagmanager.com",
    "doubleclick.net",
    "googleadservices.com",
    "googlesyndication.com",
    "facebook.com",
    "facebook.net",
    "ads.linkedin.com",
    "analytics.tiktok.com",
    "analytics.twitter.com",
    "ads-twitter.com",
    "ct.pinterest.com",
    "tr.snapchat.com",
    "alb.reddit.com",
    "hotjar.com",
    "hotjar.io",
    "api.segment.io",
    "api-js.mixpanel.com",
    "heapanalytics.com",
    "api.amplitude.com",
    "bat.bing.com",
    "clarity.ms",
    "mc.yandex.ru",
    "omtrdc.net",
    "demdex.net",
    "sc-static.net",
    "criteo.com",
    "criteo.net",
];
