use html5ever::local_name;
use kuchikiki::NodeRef;

const TITLE_CANDIDATES: [&str; 6] = [
    "og:title", "twitter:title", "dc:title", "dcterm:title",
    "weibo:article:title", "weibo:webpage:title",
];

const BYLINE_MAX_LEN: usize = 100;

pub struct Metadata {
    pub page_title: Option<String>,
    pub article_title: Option<String>,
    pub byline: Option<String>,
}

pub fn extract(root: &NodeRef) -> Metadata {
    let mut page_title = root.select_first("title")
        .map(|node| Some(node.text_contents()))
        .unwrap_or(None);

    let mut article_title = find_article_title(root);

    match (&page_title, &article_title) {
        (None, Some(at)) => { page_title = Some(at.clone()); },
        (Some(pt), None) => { article_title = Some(pt.clone()); },
        _ => (),
    }

    let byline = find_byline(root);

    Metadata { page_title, article_title, byline }
}

fn find_article_title(root: &NodeRef) -> Option<String> {
    let meta_type_attrs = [
        local_name!("name"),
        local_name!("property"),
        local_name!("itemprop"),
    ];
    // look for meta tags with `name`, `property`, or `itemprop`
    for meta in root.select("meta").unwrap() {
        for attr in meta_type_attrs.iter() {
            if let Some(type_name) = meta.attributes.borrow().get(attr) {
                if TITLE_CANDIDATES.contains(&type_name) {
                    if let Some(content) = meta.attributes.borrow().get(local_name!("content")) {
                        return Some(content.to_string());
                    }
                }
            }
        }
    }

    // if no qualifying meta tag is found, look for h1s
    // only use an h1 as title if there are no others in the document
    let mut h1s = root.select("h1").unwrap();
    match (h1s.next(), h1s.next()) {
        (Some(h), None) => return Some(h.text_contents()),
        // we don't want to accept an h2 below if there are multiple h1s
        (Some(_), Some(_)) => return None,
        _ => (),
    }

    // same deal for h2's
    let mut h2s = root.select("h2").unwrap();
    match (h2s.next(), h2s.next()) {
        (Some(h), None) => return Some(h.text_contents()),
        _ => (),
    }
    None
}

/// A byline is any element marked `rel="author"` whose text is short
/// enough to plausibly be a name rather than a bio paragraph.
fn find_byline(root: &NodeRef) -> Option<String> {
    for node in root.select("*").unwrap() {
        let rel = node.attributes.borrow().get(local_name!("rel")).unwrap_or("").to_string();
        if rel != "author" {
            continue;
        }
        let text = node.text_contents();
        let byline = text.trim();
        if !byline.is_empty() && byline.chars().count() < BYLINE_MAX_LEN {
            return Some(byline.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchikiki::{parse_html, traits::TendrilSink};

    #[test]
    fn test_extract() {
        const DOC: &str =
            "<!doctype html>
            <head>
                <title>Some Article - Some Site</title>
                <meta name=\"og:title\" content=\"Some Article\">
            </head>
            <body>
            </body>";

        let root = parse_html().one(DOC);
        let metadata = extract(&root);
        assert_eq!(metadata.page_title, Some("Some Article - Some Site".into()));
        assert_eq!(metadata.article_title, Some("Some Article".into()));
    }

    #[test]
    fn test_crossfill_when_only_article_title_present() {
        const DOC: &str =
            "<!doctype html>
            <head></head>
            <body><h1>Only Title</h1></body>";

        let root = parse_html().one(DOC);
        let metadata = extract(&root);
        assert_eq!(metadata.page_title, Some("Only Title".into()));
        assert_eq!(metadata.article_title, Some("Only Title".into()));
    }

    #[test]
    fn test_multiple_h1_yields_no_article_title() {
        const DOC: &str =
            "<!doctype html>
            <head><title>Page</title></head>
            <body><h1>First</h1><h1>Second</h1></body>";

        let root = parse_html().one(DOC);
        let metadata = extract(&root);
        assert_eq!(metadata.article_title, None);
    }

    #[test]
    fn test_byline_from_rel_author() {
        const DOC: &str =
            "<!doctype html>
            <head><title>Page</title></head>
            <body><span rel=\"author\">Jane Doe</span></body>";

        let root = parse_html().one(DOC);
        let metadata = extract(&root);
        assert_eq!(metadata.byline, Some("Jane Doe".into()));
    }

    #[test]
    fn test_byline_absent_when_too_long() {
        let long_text = "x".repeat(200);
        let doc = format!(
            "<!doctype html><head><title>Page</title></head><body><span rel=\"author\">{}</span></body>",
            long_text
        );

        let root = parse_html().one(doc.as_str());
        let metadata = extract(&root);
        assert_eq!(metadata.byline, None);
    }
}
