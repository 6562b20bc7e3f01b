use pagesnap_core::Rewrite;

/// How one rule fared against the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub find: String,
    pub matches: usize,
}

/// Per-rule match counts, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    pub rules: Vec<RuleOutcome>,
}

impl RewriteReport {
    /// Rules whose target never appeared
    pub fn missed(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.rules.iter().filter(|r| r.matches == 0)
    }

    pub fn applied(&self) -> usize {
        self.rules.iter().filter(|r| r.matches > 0).count()
    }
}

/// Apply literal substring rules to a document, in order.
///
/// Each rule replaces every occurrence of its target in the output of the
/// previous rule. A target that is absent leaves the document untouched.
/// Rules are not idempotent: running the default head injection twice
/// inserts the script tag twice.
pub fn apply_rewrites(document: &str, rules: &[Rewrite]) -> (String, RewriteReport) {
    let mut text = document.to_string();
    let mut report = RewriteReport::default();

    for rule in rules {
        let matches = text.matches(rule.find.as_str()).count();
        if matches > 0 {
            text = text.replace(&rule.find, &rule.replace);
        }
        report.rules.push(RuleOutcome {
            find: rule.find.clone(),
            matches,
        });
    }

    (text, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesnap_core::default_rewrites;
    use std::path::Path;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="description" content="A friendly web-based tool for Android performance optimization via ADB. 43 commands across 13 categories.">
    <title>adb-turbo - Android Performance</title>
    <link rel="stylesheet" href="/static/css/style.css">
</head>
<body>
    <div id="app"></div>
    <script src="/static/js/app.js"></script>
</body>
</html>
"#;

    fn rules() -> Vec<Rewrite> {
        default_rewrites(Path::new("js/demo-mode.js"))
    }

    #[test]
    fn test_default_rules_relativize_and_inject() {
        let (html, report) = apply_rewrites(PAGE, &rules());

        assert!(html.contains(r#"href="./css/style.css""#));
        assert!(html.contains(r#"src="./js/app.js""#));
        assert!(!html.contains("/static/"));
        assert!(html.contains("    <script src=\"./js/demo-mode.js\"></script>\n</head>"));
        assert!(html.contains("<title>adb-turbo (Demo) - Android Performance</title>"));
        assert!(html.contains(r#"content="Demo: A friendly web-based tool"#));
        assert!(html.contains("Run locally for full functionality."));

        assert_eq!(report.applied(), 5);
        assert_eq!(report.missed().count(), 0);
    }

    #[test]
    fn test_missing_targets_are_no_ops() {
        let page = "<html><head><title>Other app</title></head></html>";
        let (html, report) = apply_rewrites(page, &rules());

        assert_eq!(
            html,
            "<html><head><title>Other app</title>    <script src=\"./js/demo-mode.js\"></script>\n</head></html>"
        );
        let missed: Vec<&str> = report.missed().map(|r| r.find.as_str()).collect();
        assert_eq!(missed.len(), 4);
        assert!(missed.contains(&"<title>adb-turbo"));
    }

    #[test]
    fn test_head_injection_is_not_idempotent() {
        let (once, _) = apply_rewrites(PAGE, &rules());
        let (twice, report) = apply_rewrites(&once, &rules());

        assert_eq!(once.matches("demo-mode.js").count(), 1);
        assert_eq!(twice.matches("demo-mode.js").count(), 2);

        // Path rules no longer match the rewritten text
        assert_eq!(report.rules[0].matches, 0);
        assert_eq!(report.rules[1].matches, 0);
        // The title rule matches its own output again
        assert!(twice.contains("<title>adb-turbo (Demo) (Demo)"));
    }

    #[test]
    fn test_rules_apply_in_order_and_replace_all() {
        let rules = vec![Rewrite::new("a", "b"), Rewrite::new("b", "c")];
        let (text, report) = apply_rewrites("aab", &rules);
        assert_eq!(text, "ccc");
        assert_eq!(report.rules[0].matches, 2);
        assert_eq!(report.rules[1].matches, 3);
    }

    #[test]
    fn test_empty_rule_list_returns_document_unchanged() {
        let (text, report) = apply_rewrites(PAGE, &[]);
        assert_eq!(text, PAGE);
        assert!(report.rules.is_empty());
    }
}
