//! Built-in rules for the known tracker families.
//!
//! Order matters twice here. Adapters resolve first-match in
//! registration order, so specific sites sit ahead of the generic
//! fallback. Within a site the first matching pattern decides the
//! label; each table keeps the order its site's markup demands (u2
//! lists the double-upload patterns ahead of plain free because the
//! free class name is a prefix of the others).

use std::sync::Arc;

use regex_lite::Regex;

use crate::config::AdapterOverride;
use crate::extract::{DiscountLabel, DiscountRule};

use super::ajax::AjaxPromotionExtractor;
use super::types::{
    AdapterError, DiscountExtractor, PatternExtractor, PeerPageRule, SiteAdapter,
};

fn rule(pattern: &str, label: DiscountLabel) -> DiscountRule {
    DiscountRule::new(pattern, label).expect("built-in pattern must compile")
}

fn chdbits_rules() -> Vec<DiscountRule> {
    vec![
        rule(r"pro_free.*?</h1>", DiscountLabel::Free),
        rule(r"pro_2up.*?</h1>", DiscountLabel::TwoX),
        rule(r"pro_free2up.*?</h1>", DiscountLabel::TwoXFree),
        rule(r"pro_30pctdown.*?</h1>", DiscountLabel::ThirtyPercent),
        rule(r"pro_50pctdown.*?</h1>", DiscountLabel::HalfDown),
        rule(r"pro_50pctdown2up.*?</h1>", DiscountLabel::TwoXHalfDown),
    ]
}

fn chdbits_hit_run(body: &str) -> bool {
    body.contains("<b>H&R")
}

fn u2_rules() -> Vec<DiscountRule> {
    vec![
        rule(r"class=.pro_2up.*?promotion.*?</td>", DiscountLabel::TwoX),
        rule(r"class=.pro_free2up.*?promotion.*?</td>", DiscountLabel::TwoXFree),
        rule(r"class=.pro_free.*?promotion.*?</td>", DiscountLabel::Free),
        rule(r"class=.pro_30pctdown.*?promotion.*?</td>", DiscountLabel::ThirtyPercent),
        rule(r"class=.pro_50pctdown.*?promotion.*?</td>", DiscountLabel::HalfDown),
        rule(r"class=.pro_50pctdown2up.*?promotion.*?</td>", DiscountLabel::TwoXHalfDown),
        // the "0.00X" custom rate is effectively free at double upload
        rule(r"class=.pro_custom.*?0\.00X.*?promotion.*?</td>", DiscountLabel::TwoXFree),
    ]
}

fn totheglory_rules() -> Vec<DiscountRule> {
    vec![
        rule(r"本种子限时不计流量.*?</font>", DiscountLabel::Free),
        rule(r"本种子的下载流量计为实际流量的30%.*?</font>", DiscountLabel::ThirtyPercent),
        rule(r"本种子的下载流量会减半.*?</font>", DiscountLabel::HalfDown),
    ]
}

/// Matched against the promotion snippet from the AJAX endpoint, not
/// the detail page.
fn hdchina_rules() -> Vec<DiscountRule> {
    vec![
        rule(r"pro_free.*?</h2>", DiscountLabel::Free),
        rule(r"pro_2up.*?</h2>", DiscountLabel::TwoX),
        rule(r"pro_free2up.*?</h2>", DiscountLabel::TwoXFree),
        rule(r"pro_30pctdown.*?</h2>", DiscountLabel::ThirtyPercent),
        rule(r"pro_50pctdown.*?</h2>", DiscountLabel::HalfDown),
        rule(r"pro_50pctdown2up.*?</h2>", DiscountLabel::TwoXHalfDown),
    ]
}

fn opencd_rules() -> Vec<DiscountRule> {
    vec![
        rule(r"pro_free", DiscountLabel::Free),
        rule(r"pro_2up", DiscountLabel::TwoX),
        rule(r"pro_free2up", DiscountLabel::TwoXFree),
        rule(r"pro_30pctdown", DiscountLabel::ThirtyPercent),
        rule(r"pro_50pctdown", DiscountLabel::HalfDown),
        rule(r"pro_50pctdown2up", DiscountLabel::TwoXHalfDown),
    ]
}

fn generic_rules() -> Vec<DiscountRule> {
    vec![
        rule(r"class='free'.*?免.*?</h1>", DiscountLabel::Free),
        rule(r"class='twoup'.*?2X.*?</h1>", DiscountLabel::TwoX),
        rule(r"class='twoupfree'.*?2X免.*?</h1>", DiscountLabel::TwoXFree),
        rule(r"class='thirtypercent'.*?30%.*?</h1>", DiscountLabel::ThirtyPercent),
        rule(r"class='halfdown'.*?50%.*?</h1>", DiscountLabel::HalfDown),
        rule(r"class='twouphalfdown'.*?2X 50%.*?</h1>", DiscountLabel::TwoXHalfDown),
    ]
}

fn lemonhd_peer_rule() -> PeerPageRule {
    PeerPageRule::Rewrite {
        pattern: Regex::new(r"details_\w+\.php").expect("built-in pattern must compile"),
        replacement: "viewpeerlist.php",
    }
}

/// User tokens compiled into a rule table, tried in label order.
fn override_rules(tokens: &AdapterOverride) -> Result<Vec<DiscountRule>, AdapterError> {
    tokens
        .tokens()
        .into_iter()
        .map(|(label, pattern)| {
            DiscountRule::new(pattern, label).map_err(|source| AdapterError::InvalidToken {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}

/// The six-site skeleton: matchers, peer-page rules and hit-and-run
/// predicates. Discount tables are supplied per site so the override
/// path can swap them out while keeping everything else.
fn site_adapters(discount_tables: Vec<Arc<dyn DiscountExtractor>>) -> Vec<SiteAdapter> {
    let mut tables = discount_tables.into_iter();
    let mut next = move || tables.next().expect("one discount table per site");
    vec![
        SiteAdapter::new("chdbits", "chdbits", next()).with_hit_run(chdbits_hit_run),
        SiteAdapter::new("u2.dmhy", "u2.dmhy", next()),
        SiteAdapter::new("totheglory", "totheglory", next())
            .with_peer_page(PeerPageRule::Unavailable),
        SiteAdapter::new("hdchina", "hdchina", next()),
        SiteAdapter::new("open.cd", "open.cd", next())
            .with_detail_rewrite("details.php", "plugin_details.php"),
        SiteAdapter::new("lemonhd", "lemonhd", next()).with_peer_page(lemonhd_peer_rule()),
    ]
}

pub(super) fn builtin_adapters() -> (Vec<SiteAdapter>, SiteAdapter) {
    let tables: Vec<Arc<dyn DiscountExtractor>> = vec![
        Arc::new(PatternExtractor::new(chdbits_rules())),
        Arc::new(PatternExtractor::new(u2_rules())),
        Arc::new(PatternExtractor::new(totheglory_rules())),
        Arc::new(AjaxPromotionExtractor::new(hdchina_rules())),
        Arc::new(PatternExtractor::new(opencd_rules())),
        // lemonhd shares the generic markup; it only differs in the
        // peer page path
        Arc::new(PatternExtractor::new(generic_rules())),
    ];
    let adapters = site_adapters(tables);
    let fallback = SiteAdapter::new(
        "generic",
        "",
        Arc::new(PatternExtractor::new(generic_rules())),
    );
    (adapters, fallback)
}

/// Same adapters, with every discount table replaced by the user's
/// tokens. Hit-and-run predicates and peer-page rules are kept.
pub(super) fn override_adapters(
    tokens: &AdapterOverride,
) -> Result<(Vec<SiteAdapter>, SiteAdapter), AdapterError> {
    let rules = override_rules(tokens)?;
    let shared: Arc<dyn DiscountExtractor> = Arc::new(PatternExtractor::new(rules.clone()));
    let adapters = site_adapters(vec![Arc::clone(&shared); 6]);
    let fallback = SiteAdapter::new("generic", "", Arc::new(PatternExtractor::new(rules)));
    Ok((adapters, fallback))
}
