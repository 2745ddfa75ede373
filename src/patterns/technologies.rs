//! Built-in technology fingerprints and the data-layer event catalog

pub(crate) struct TechnologyDefinition {
    pub name: &'static str,
    pub patterns: &'static [&'static str],
    /// (meta tag name, value regex)
    pub meta: &'static [(&'static str, &'static str)],
    pub category: &'static str,
}

pub(crate) const TECHNOLOGY_DEFINITIONS: &[TechnologyDefinition] = &[
    TechnologyDefinition {
        name: "wordpress",
        patterns: &[r"wp-content/", r"wp-includes/", r"/wordpress/"],
        meta: &[("generator", r"WordPress")],
        category: "CMS",
    },
    TechnologyDefinition {
        name: "shopify",
        patterns: &[r"cdn\.shopify\.com", r"Shopify\.theme"],
        meta: &[],
        category: "E-commerce",
    },
    TechnologyDefinition {
        name: "react",
        patterns: &[r"react\.", r"React\.createElement", r"__REACT"],
        meta: &[],
        category: "JavaScript Framework",
    },
    TechnologyDefinition {
        name: "vue",
        patterns: &[r"Vue\.js", r"vue\.", r"__VUE__"],
        meta: &[],
        category: "JavaScript Framework",
    },
    TechnologyDefinition {
        name: "angular",
        patterns: &[r"angular\.", r"ng-app", r"ng-controller"],
        meta: &[],
        category: "JavaScript Framework",
    },
    TechnologyDefinition {
        name: "next_js",
        patterns: &[r"__NEXT_DATA__", r"_next/static"],
        meta: &[],
        category: "JavaScript Framework",
    },
    TechnologyDefinition {
        name: "jquery",
        patterns: &[r"jquery"],
        meta: &[],
        category: "JavaScript Library",
    },
    TechnologyDefinition {
        name: "bootstrap",
        patterns: &[r"bootstrap"],
        meta: &[],
        category: "CSS Framework",
    },
    TechnologyDefinition {
        name: "cloudflare",
        patterns: &[r"cloudflare"],
        meta: &[],
        category: "CDN",
    },
];

/// GA4 recommended events and their report labels
pub(crate) const EVENT_CATALOG: &[(&str, &str)] = &[
    ("page_view", "Page View"),
    ("scroll", "Scroll Tracking"),
    ("click", "Click Tracking"),
    ("view_item", "Product View"),
    ("add_to_cart", "Add to Cart"),
    ("remove_from_cart", "Remove from Cart"),
    ("view_cart", "View Cart"),
    ("begin_checkout", "Begin Checkout"),
    ("add_payment_info", "Payment Info Added"),
    ("add_shipping_info", "Shipping Info Added"),
    ("purchase", "Purchase"),
    ("refund", "Refund"),
    ("view_item_list", "Product List View"),
    ("select_item", "Product Click"),
    ("view_promotion", "Promotion View"),
    ("select_promotion", "Promotion Click"),
    ("login", "Login"),
    ("sign_up", "Sign Up"),
    ("share", "Share"),
    ("search", "Search"),
    ("generate_lead", "Lead Generation"),
    ("view_search_results", "Search Results View"),
    ("file_download", "File Download"),
    ("form_start", "Form Start"),
    ("form_submit", "Form Submit"),
];
