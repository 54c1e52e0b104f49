//! Merging caller overrides into rendered messages

use std::collections::{BTreeSet, HashSet};

use super::message::{Alternative, MergeOverride, RenderedMessage};

/// Combine `merge` into `message`.
///
/// Recipient lists, attachments and headers are set unions, so nothing is
/// duplicated. Alternatives keep the message's order followed by new parts
/// from the override, with exact duplicates dropped.
pub fn merge_message(mut message: RenderedMessage, merge: Option<&MergeOverride>) -> RenderedMessage {
    let Some(merge) = merge else {
        return message;
    };

    union_into(&mut message.to, &merge.to);
    union_into(&mut message.cc, &merge.cc);
    union_into(&mut message.bcc, &merge.bcc);
    union_into(&mut message.reply_to, &merge.reply_to);
    union_into(&mut message.attachments, &merge.attachments);
    union_into(&mut message.headers, &merge.headers);

    message.alternatives = append_unique(message.alternatives, &merge.alternatives);

    message
}

fn union_into<T: Ord + Clone>(target: &mut BTreeSet<T>, extra: &BTreeSet<T>) {
    target.extend(extra.iter().cloned());
}

fn append_unique(base: Vec<Alternative>, extra: &[Alternative]) -> Vec<Alternative> {
    let mut seen = HashSet::with_capacity(base.len() + extra.len());
    base.into_iter()
        .chain(extra.iter().cloned())
        .filter(|alt| seen.insert(alt.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Attachment, Header};

    fn message() -> RenderedMessage {
        RenderedMessage {
            from: Some("noreply@example.com".to_string()),
            subject: "Hi".to_string(),
            body: "Body".to_string(),
            alternatives: vec![
                Alternative::new("plain-ish", "text/enriched"),
                Alternative::html("<b>Hi</b>"),
            ],
            to: ["a@example.com", "b@example.com"]
                .into_iter()
                .map(String::from)
                .collect(),
            cc: BTreeSet::new(),
            bcc: BTreeSet::new(),
            reply_to: BTreeSet::new(),
            attachments: BTreeSet::new(),
            headers: [Header::new("X-Kind", "welcome")].into_iter().collect(),
        }
    }

    #[test]
    fn test_no_override_passes_through() {
        let original = message();
        assert_eq!(merge_message(original.clone(), None), original);
    }

    #[test]
    fn test_recipient_union() {
        let merge = MergeOverride::new().to("b@example.com").to("c@example.com");
        let merged = merge_message(message(), Some(&merge));

        let expected: BTreeSet<String> = ["a@example.com", "b@example.com", "c@example.com"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(merged.to, expected);
    }

    #[test]
    fn test_all_set_fields_union() {
        let pdf = Attachment::new("invoice.pdf", "application/pdf", b"%PDF-1.4".to_vec());
        let merge = MergeOverride::new()
            .cc("cc@example.com")
            .bcc("audit@example.com")
            .reply_to("support@example.com")
            .attachment(pdf.clone())
            .header("X-Kind", "welcome")
            .header("X-Campaign", "spring");

        let merged = merge_message(message(), Some(&merge));

        assert!(merged.cc.contains("cc@example.com"));
        assert!(merged.bcc.contains("audit@example.com"));
        assert!(merged.reply_to.contains("support@example.com"));
        assert_eq!(merged.attachments.len(), 1);
        assert!(merged.attachments.contains(&pdf));
        assert_eq!(merged.headers.len(), 2);
    }

    #[test]
    fn test_empty_override_changes_nothing() {
        let original = message();
        let merged = merge_message(original.clone(), Some(&MergeOverride::new()));
        assert_eq!(merged, original);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let original = message();
        let same = MergeOverride {
            to: original.to.clone(),
            cc: original.cc.clone(),
            bcc: original.bcc.clone(),
            reply_to: original.reply_to.clone(),
            attachments: original.attachments.clone(),
            headers: original.headers.clone(),
            alternatives: original.alternatives.clone(),
        };

        let once = merge_message(original.clone(), Some(&same));
        assert_eq!(once, original);

        let twice = merge_message(once.clone(), Some(&same));
        assert_eq!(twice, once);
    }

    #[test]
    fn test_alternatives_append_in_order_without_duplicates() {
        let merge = MergeOverride::new()
            .alternative(Alternative::html("<b>Hi</b>"))
            .alternative(Alternative::new("{\"hi\":true}", "application/json"))
            .alternative(Alternative::new("plain-ish", "text/enriched"));

        let merged = merge_message(message(), Some(&merge));

        assert_eq!(
            merged.alternatives,
            vec![
                Alternative::new("plain-ish", "text/enriched"),
                Alternative::html("<b>Hi</b>"),
                Alternative::new("{\"hi\":true}", "application/json"),
            ]
        );
    }

    #[test]
    fn test_same_content_different_type_is_kept() {
        let merge = MergeOverride::new().alternative(Alternative::new("<b>Hi</b>", "text/xml"));
        let merged = merge_message(message(), Some(&merge));
        assert_eq!(merged.alternatives.len(), 3);
    }
}
