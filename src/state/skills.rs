use aho_corasick::AhoCorasick;
use std::collections::HashSet;

const OPEN_TAG: usize = 0;
const CLOSE_TAG: usize = 1;

/// Pulls every `<location>…</location>` value out of a skills snapshot
/// document, in document order, deduped by first occurrence. Content is taken
/// verbatim between the tags. A document without tags yields an empty list.
pub fn extract_skill_paths(document: &str) -> Vec<String> {
    let searcher = AhoCorasick::new(["<location>", "</location>"])
        .expect("static tag patterns are valid");

    let mut paths = Vec::new();
    let mut seen = HashSet::new();
    let mut open_at: Option<usize> = None;

    for found in searcher.find_iter(document) {
        match found.pattern().as_usize() {
            OPEN_TAG => open_at = Some(found.end()),
            CLOSE_TAG => {
                if let Some(start) = open_at.take() {
                    let content = &document[start..found.start()];
                    if !content.is_empty() && seen.insert(content.to_string()) {
                        paths.push(content.to_string());
                    }
                }
            }
            _ => unreachable!(),
        }
    }

    paths
}
