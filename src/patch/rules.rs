use crate::config::Rule;

/// How often one rule's anchor was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReport {
    pub label: String,
    pub occurrences: usize,
}

/// Apply `rules` to `text` in order.
///
/// Every occurrence of a rule's anchor is replaced, and each rule sees the
/// output of the previous one. Nothing checks whether a replacement has
/// already been applied: running the same rules over their own output inserts
/// the blocks again whenever a replacement still contains its anchor.
pub fn apply_rules(text: &str, rules: &[Rule]) -> (String, Vec<RuleReport>) {
    let mut out = text.to_string();
    let mut reports = Vec::with_capacity(rules.len());
    for rule in rules {
        let occurrences = out.matches(rule.anchor.as_str()).count();
        if occurrences > 0 {
            out = out.replace(rule.anchor.as_str(), &rule.replacement);
        }
        reports.push(RuleReport {
            label: rule.label().to_string(),
            occurrences,
        });
    }
    (out, reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const SERVER: &str = "\
import time
import _thread

try:
    import ujson as json
except:
    import json

def serve(conn, method, path, query, request_str):
                if path == '/':
                    conn.send(index())
                else:
                    # 404
                    conn.send(b'HTTP/1.1 404 Not Found\\r\\n\\r\\n')
";

    fn rule(anchor: &str, replacement: &str) -> Rule {
        Rule {
            name: None,
            anchor: anchor.into(),
            replacement: replacement.into(),
        }
    }

    fn default_rules() -> Vec<Rule> {
        Config::builtin().unwrap().patches.remove(0).rules
    }

    #[test]
    fn import_anchor_is_replaced_by_import_block() {
        let rules = default_rules();
        let (out, reports) = apply_rules(SERVER, &rules[..1]);
        assert_eq!(reports[0].occurrences, 1);
        assert_eq!(reports[0].label, "file-manager import");
        assert!(out.contains("    from file_manager import handle_file_api\n"));
        let import_at = out.find("from file_manager").unwrap();
        let json_at = out.find("import ujson as json").unwrap();
        assert!(import_at < json_at);
        assert!(!out.contains("path.startswith('/files')"));
    }

    #[test]
    fn routing_anchor_is_replaced_by_routing_block() {
        let rules = default_rules();
        let (out, reports) = apply_rules(SERVER, &rules[1..]);
        assert_eq!(reports[0].occurrences, 1);
        assert!(out.contains(
            "                elif path.startswith('/files') and FILE_MANAGER_ENABLED:\n"
        ));
        let route_at = out.find("path.startswith('/files')").unwrap();
        let fallback_at = out.find("# 404").unwrap();
        assert!(route_at < fallback_at);
        assert!(!out.contains("from file_manager"));
    }

    #[test]
    fn both_rules_apply_in_one_pass() {
        let (out, reports) = apply_rules(SERVER, &default_rules());
        assert!(reports.iter().all(|r| r.occurrences == 1));
        assert!(out.contains("handle_file_api(path, query, method, body)"));
        assert!(out.contains("FILE_MANAGER_ENABLED = True"));
    }

    // Known limitation: patching is not idempotent.
    #[test]
    fn reapplying_duplicates_inserted_blocks() {
        let rules = default_rules();
        let (once, _) = apply_rules(SERVER, &rules);
        let (twice, reports) = apply_rules(&once, &rules);
        assert!(reports.iter().all(|r| r.occurrences == 1));
        assert_eq!(once.matches("from file_manager import").count(), 1);
        assert_eq!(twice.matches("from file_manager import").count(), 2);
        assert_eq!(twice.matches("path.startswith('/files')").count(), 2);
    }

    #[test]
    fn missing_anchor_leaves_text_untouched() {
        let (out, reports) = apply_rules("nothing here\n", &[rule("# 404", "x")]);
        assert_eq!(out, "nothing here\n");
        assert_eq!(reports[0].occurrences, 0);
        assert_eq!(reports[0].label, "# 404");
    }

    #[test]
    fn every_occurrence_is_replaced() {
        let (out, reports) = apply_rules("a-a-a", &[rule("a", "b")]);
        assert_eq!(out, "b-b-b");
        assert_eq!(reports[0].occurrences, 3);
    }

    #[test]
    fn later_rules_see_earlier_output() {
        let rules = [rule("one", "two"), rule("two", "three")];
        let (out, reports) = apply_rules("one", &rules);
        assert_eq!(out, "three");
        assert_eq!(reports[1].occurrences, 1);
    }
}
