//! Heuristic article-body extraction for HTML documents.
//!
//! Parses a document, strips boilerplate, scores candidate paragraphs and
//! their ancestors, and returns the highest-scoring subtree (plus whatever
//! siblings look promising) as a `<div>`. Runs the whole pipeline up to
//! four times, relaxing heuristics one at a time, until enough text
//! survives.

use std::collections::VecDeque;
use std::iter;

use html5ever::{local_name, namespace_url, ns, QualName};
use kuchikiki::iter::NodeIterator;
use kuchikiki::traits::TendrilSink;
use kuchikiki::{NodeData, NodeRef};
use lazy_static::lazy_static;
use log::trace;
use regex::Regex;
use url::Url;

pub use error::ReadabilityError;
pub use metadata::Metadata;
use node_cache::{same_node, NodeCache};

mod error;
mod metadata;
mod node_cache;

macro_rules! tag {
    ($name:tt) => {
        QualName {
            prefix: None,
            ns: ns!(html),
            local: local_name!($name),
        }
    };
}

macro_rules! attrib {
    ($name:tt) => {
        local_name!($name)
    };
}

lazy_static! {
    static ref UNLIKELY_RE: Regex = Regex::new(r"(?i)combx|comment|community|disqus|extra|foot|header|menu|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|tweet|twitter").unwrap();
    static ref MAYBE_RE: Regex = Regex::new(r"(?i)and|article|body|column|main|shadow").unwrap();
    static ref POSITIVE_RE: Regex = Regex::new(r"(?i)article|body|content|entry|hentry|main|page|pagination|post|text|blog|story").unwrap();
    static ref NEGATIVE_RE: Regex = Regex::new(r"(?i)combx|comment|com-|contact|foot|footer|footnote|masthead|media|meta|outbrain|promo|related|scroll|shoutbox|sidebar|sponsor|shopping|tags|tool|widget").unwrap();
    static ref VIDEO_RE: Regex = Regex::new(r"(?i)http://(www\.)?(youtube|vimeo)\.com").unwrap();
    static ref SENT_RE: Regex = Regex::new(r"\.( |$)").unwrap();
    static ref PROTOCOL_RE: Regex = Regex::new(r"^\w+:").unwrap();
}

trait NodeRefExt {
    fn is(&self, name: QualName) -> bool;
    fn replace(&self, node: &NodeRef);
    fn remove(&self);
    fn rename(&self, name: QualName) -> NodeRef;
}

impl NodeRefExt for NodeRef {
    fn is(&self, name: QualName) -> bool {
        self.as_element().map_or(false, |e| e.name == name)
    }

    fn replace(&self, node: &NodeRef) {
        self.insert_before(node.clone());
        self.detach();
    }

    fn remove(&self) {
        self.detach();
    }

    fn rename(&self, name: QualName) -> NodeRef {
        if let Some(elem) = self.as_element() {
            let attributes = elem.attributes.borrow();
            let replacement = NodeRef::new_element(name, attributes.map.clone());

            for child in self.children() {
                replacement.append(child);
            }

            self.replace(&replacement);
            replacement
        } else {
            self.clone()
        }
    }
}

// ---------------------------------------------------------------------
// Text & attribute utilities (§4.1)
// ---------------------------------------------------------------------

/// Concatenates a node's own text and every descendant's text in document
/// order. A DOM has no separate text/tail fields the way lxml does — a
/// "tail" is just the text-node sibling that follows an element, and it
/// falls out of this recursion naturally since we walk every child in
/// order, not only element children.
fn inner_text(node: &NodeRef, normalize: bool) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    if normalize {
        let mut collapsed = String::with_capacity(out.len());
        let mut last_was_space = false;
        for ch in out.chars() {
            if ch.is_whitespace() {
                if !last_was_space {
                    collapsed.push(' ');
                }
                last_was_space = true;
            } else {
                collapsed.push(ch);
                last_was_space = false;
            }
        }
        collapsed
    } else {
        out
    }
}

fn collect_text(node: &NodeRef, out: &mut String) {
    if let Some(text) = node.as_text() {
        out.push(' ');
        out.push_str(&text.borrow());
        return;
    }
    for child in node.children() {
        collect_text(&child, out);
    }
}

fn char_count(node: &NodeRef, ch: char) -> usize {
    let text = inner_text(node, true);
    text.matches(ch).count()
}

fn link_density(node: &NodeRef) -> f32 {
    let text_len = inner_text(node, true).chars().count();
    if text_len == 0 {
        return 0.0;
    }
    let link_len: usize = node
        .descendants()
        .elements()
        .filter(|e| e.name == tag!("a"))
        .map(|e| inner_text(e.as_node(), true).chars().count())
        .sum();
    link_len as f32 / text_len as f32
}

fn get_clsid(node: &NodeRef) -> (String, String) {
    match node.as_element() {
        Some(e) => {
            let attrs = e.attributes.borrow();
            (
                attrs.get(attrib!("class")).unwrap_or("").to_string(),
                attrs.get(attrib!("id")).unwrap_or("").to_string(),
            )
        }
        None => (String::new(), String::new()),
    }
}

fn class_weight(node: &NodeRef, flags: &Flags) -> f32 {
    if !flags.class_weight {
        return 0.0;
    }

    let (class, id) = get_clsid(node);
    let mut weight = 0.0;

    if !class.is_empty() {
        if NEGATIVE_RE.is_match(&class) {
            weight -= 25.0;
        }
        if POSITIVE_RE.is_match(&class) {
            weight += 25.0;
        }
    }
    if !id.is_empty() {
        if NEGATIVE_RE.is_match(&id) {
            weight -= 25.0;
        }
        if POSITIVE_RE.is_match(&id) {
            weight += 25.0;
        }
    }

    weight
}

fn count_tag(node: &NodeRef, tag_name: &str) -> usize {
    node.descendants()
        .elements()
        .filter(|e| e.name.local.as_ref() == tag_name)
        .count()
}

// ---------------------------------------------------------------------
// Classifier (§4.3)
// ---------------------------------------------------------------------

fn is_unlikely(node: &NodeRef, flags: &Flags) -> bool {
    if !flags.strip_unlikely {
        return false;
    }
    if node.is(tag!("body")) {
        return false;
    }

    let (class, id) = get_clsid(node);
    let s = format!("{}{}", class, id);
    UNLIKELY_RE.is_match(&s) && !MAYBE_RE.is_match(&s)
}

// ---------------------------------------------------------------------
// Tree rewriter (§4.2)
// ---------------------------------------------------------------------

/// Splits `node`'s children into lxml's (leading text, [(element, tail
/// text)]) shape, so the br/paragraph rewrites below can be ported
/// directly without re-deriving the grouping logic at each call site.
fn children_with_tails(node: &NodeRef) -> (String, Vec<(NodeRef, String)>) {
    let mut leading = String::new();
    let mut items = Vec::new();
    let mut current: Option<NodeRef> = None;
    let mut tail = String::new();

    for child in node.children() {
        if let Some(text) = child.as_text() {
            if current.is_some() {
                tail.push_str(&text.borrow());
            } else {
                leading.push_str(&text.borrow());
            }
        } else {
            if let Some(el) = current.take() {
                items.push((el, std::mem::take(&mut tail)));
            }
            current = Some(child.clone());
        }
    }
    if let Some(el) = current.take() {
        items.push((el, tail));
    }

    (leading, items)
}

fn own_tail_text(node: &NodeRef) -> Option<(NodeRef, String)> {
    let next = node.next_sibling()?;
    let text = next.as_text()?.borrow().clone();
    Some((next, text))
}

fn make_p(text: &str) -> NodeRef {
    let p = NodeRef::new_element(tag!("p"), iter::empty());
    p.append(NodeRef::new_text(text.to_string()));
    p
}

fn convert_brs(node: &NodeRef) -> NodeRef {
    let has_br = node.children().elements().any(|e| e.name == tag!("br"));

    let node = if has_br {
        let elem = node.as_element().unwrap();
        let name = elem.name.clone();
        let attrs = elem.attributes.borrow().map.clone();
        let newn = NodeRef::new_element(name, attrs);

        let (leading, items) = children_with_tails(node);
        if !leading.trim().is_empty() {
            newn.append(make_p(&leading));
        }

        for (child, tail) in items {
            let is_br = child.is(tag!("br"));
            child.remove();
            if is_br {
                if !tail.trim().is_empty() {
                    newn.append(make_p(&tail));
                }
            } else {
                newn.append(child);
                if !tail.trim().is_empty() {
                    newn.append(make_p(&tail));
                }
            }
        }

        node.replace(&newn);
        newn
    } else {
        node.clone()
    };

    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        if child.as_element().is_some() {
            convert_brs(&child);
        }
    }

    node
}

fn paragraphize_text(node: &NodeRef) -> Vec<NodeRef> {
    let elem = node.as_element().unwrap();
    let name = elem.name.clone();
    let attrs = elem.attributes.borrow().map.clone();
    let newn = NodeRef::new_element(name, attrs);

    let mut to_score = Vec::new();
    let (leading, items) = children_with_tails(node);

    if !leading.trim().is_empty() {
        let p = make_p(&leading);
        newn.append(p.clone());
        to_score.push(p);
    }

    for (child, tail) in items {
        child.remove();
        newn.append(child);
        if !tail.trim().is_empty() {
            let p = make_p(&tail);
            newn.append(p.clone());
            to_score.push(p);
        }
    }

    if let Some((tail_node, text)) = own_tail_text(node) {
        if !text.trim().is_empty() {
            let p = make_p(&text);
            newn.append(p.clone());
            to_score.push(p);
        }
        tail_node.remove();
    }

    node.replace(&newn);
    to_score
}

fn node_copy(node: &NodeRef, tag_override: Option<QualName>) -> NodeRef {
    if let Some(text) = node.as_text() {
        return NodeRef::new_text(text.borrow().clone());
    }
    if let Some(elem) = node.as_element() {
        let name = tag_override.unwrap_or_else(|| elem.name.clone());
        let attrs = elem.attributes.borrow().map.clone();
        let newn = NodeRef::new_element(name, attrs);
        for child in node.children() {
            newn.append(node_copy(&child, None));
        }
        return newn;
    }
    node.clone()
}

fn has_block_child(node: &NodeRef) -> bool {
    node.descendants().elements().any(|e| {
        matches!(
            e.name.local.as_ref(),
            "a" | "blockquote" | "dl" | "div" | "img" | "ol" | "p" | "pre" | "table" | "ul"
        )
    })
}

// ---------------------------------------------------------------------
// Document prep / cleaner dispatch (§4.4)
// ---------------------------------------------------------------------

fn strip_boilerplate(node: &NodeRef) {
    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        let remove = match &*child.data() {
            NodeData::Comment(_) | NodeData::DocumentFragment | NodeData::ProcessingInstruction(_) => true,
            NodeData::Text(t) => t.borrow().trim().is_empty(),
            NodeData::Element(e) => matches!(e.name.local.as_ref(), "script" | "style" | "noscript"),
            _ => false,
        };

        if remove {
            child.remove();
            continue;
        }
        if child.as_element().is_some() {
            strip_boilerplate(&child);
        }
    }
}

fn prep_document(data: &str) -> NodeRef {
    let top = kuchikiki::parse_html().one(data);
    strip_boilerplate(&top);

    let body = top
        .select("html > body")
        .ok()
        .and_then(|mut it| it.next())
        .map(|b| b.as_node().clone());

    let body = body.unwrap_or_else(|| {
        let newbody = NodeRef::new_element(tag!("body"), iter::empty());
        let children: Vec<NodeRef> = top.children().collect();
        for child in children {
            child.remove();
            newbody.append(child);
        }
        top.append(newbody.clone());
        newbody
    });

    if let Some(e) = body.as_element() {
        e.attributes
            .borrow_mut()
            .insert(attrib!("id"), "readableBody".to_string());
    }

    if let Some(parent) = body.parent() {
        let siblings: Vec<NodeRef> = parent.children().filter(|c| !same_node(c, &body)).collect();
        for s in siblings {
            s.remove();
        }
    }

    convert_brs(&body)
}

fn clean(node: &NodeRef, tag_name: &str) {
    let targets: Vec<NodeRef> = node
        .descendants()
        .elements()
        .filter(|e| e.name.local.as_ref() == tag_name)
        .map(|e| e.as_node().clone())
        .collect();

    let is_embed_tag = tag_name == "object" || tag_name == "embed";

    for n in targets {
        if is_embed_tag {
            if let Some(e) = n.as_element() {
                let attrs = e.attributes.borrow();
                let joined = attrs
                    .map
                    .values()
                    .map(|a| a.value.as_str())
                    .collect::<Vec<_>>()
                    .join("|");
                if VIDEO_RE.is_match(&joined) {
                    continue;
                }
            }
        }
        trace!("clean: removing <{}>", tag_name);
        n.remove();
    }
}

fn clean_conditionally(node: &NodeRef, tag_name: &str, cache: &NodeCache<ScoreInfo>, flags: &Flags) {
    if !flags.clean_conditionally {
        return;
    }

    let targets: Vec<NodeRef> = node
        .descendants()
        .elements()
        .filter(|e| e.name.local.as_ref() == tag_name)
        .map(|e| e.as_node().clone())
        .collect();

    for n in targets {
        if same_node(&n, node) {
            continue;
        }

        let w = class_weight(&n, flags);
        let s = cache.get(&n).map(|i| i.score).unwrap_or(0.0);

        if w + s < 0.0 {
            trace!("clean_conditionally: removing <{}> (negative weight)", tag_name);
            n.remove();
            continue;
        }

        if char_count(&n, ',') >= 10 {
            continue;
        }

        let num_p = count_tag(&n, "p") as i64;
        let num_img = count_tag(&n, "img") as i64;
        let num_li = count_tag(&n, "li") as i64 - 100;
        let num_input = count_tag(&n, "input") as i64;
        let num_embeds = n
            .descendants()
            .elements()
            .filter(|e| e.name.local.as_ref() == "embed")
            .filter(|e| {
                let attrs = e.attributes.borrow();
                let src = attrs.get(attrib!("src")).unwrap_or("");
                VIDEO_RE.is_match(src)
            })
            .count() as i64;
        let ld = link_density(&n);
        let content_len = inner_text(&n, true).chars().count() as i64;

        let remove = num_img > num_p
            || (num_li > num_p && tag_name != "ul" && tag_name != "ol")
            || num_input > num_p / 3
            || (content_len < 25 && (num_img == 0 || num_img > 2))
            || (w < 25.0 && ld > 0.2)
            || (w >= 25.0 && ld > 0.5)
            || ((num_embeds == 1 && content_len < 75) || num_embeds > 1);

        if remove {
            trace!("clean_conditionally: removing <{}> (shabby metrics)", tag_name);
            n.remove();
        }
    }
}

fn clean_headers(node: &NodeRef, flags: &Flags) {
    // covers h1 and h2; h0 is never a real tag and matches nothing
    for i in 0..3 {
        let tag_name = format!("h{}", i);
        let targets: Vec<NodeRef> = node
            .descendants()
            .elements()
            .filter(|e| e.name.local.as_ref() == tag_name)
            .map(|e| e.as_node().clone())
            .collect();

        for n in targets {
            let cw = class_weight(&n, flags);
            let ld = link_density(&n);
            if cw < 0.0 || ld > 0.33 {
                n.remove();
            }
        }
    }
}

fn clean_styles(node: &NodeRef) {
    if let Some(e) = node.as_element() {
        e.attributes.borrow_mut().remove(attrib!("style"));
    }
    for child in node.children() {
        clean_styles(&child);
    }
}

fn fix_relative_urls(node: &NodeRef, base: &Url) {
    if let Some(e) = node.as_element() {
        let name = if e.name == tag!("a") {
            Some(attrib!("href"))
        } else if e.name == tag!("img") {
            Some(attrib!("src"))
        } else {
            None
        };
        if let Some(name) = name {
            let mut attrs = e.attributes.borrow_mut();
            if let Some(val) = attrs.get_mut(name) {
                fix_url(val, base);
            }
        }
    }
    for child in node.children() {
        fix_relative_urls(&child, base);
    }
}

fn fix_url(val: &mut String, base: &Url) {
    if val.is_empty() || PROTOCOL_RE.is_match(val) || val.starts_with('#') {
        return;
    }
    if let Ok(resolved) = base.join(val) {
        *val = resolved.into();
    }
}

fn prep_article(content: &NodeRef, cache: &NodeCache<ScoreInfo>, flags: &Flags) {
    clean_styles(content);
    clean_conditionally(content, "form", cache, flags);
    clean(content, "object");
    clean(content, "h1");
    if count_tag(content, "h2") == 1 {
        clean(content, "h2");
    }
    clean(content, "iframe");
    clean_headers(content, flags);
    clean_conditionally(content, "table", cache, flags);
    clean_conditionally(content, "ul", cache, flags);
    clean_conditionally(content, "div", cache, flags);

    let paragraphs: Vec<NodeRef> = content
        .descendants()
        .elements()
        .filter(|e| e.name == tag!("p"))
        .map(|e| e.as_node().clone())
        .collect();

    for p in paragraphs {
        let has_media = p
            .descendants()
            .elements()
            .any(|e| matches!(e.name.local.as_ref(), "img" | "embed" | "object"));
        if !has_media {
            let text = inner_text(&p, false);
            if !text.is_empty() {
                p.remove();
            }
        }
    }
}

// ---------------------------------------------------------------------
// Scorer (§4.5)
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Default)]
struct ScoreInfo {
    score: f32,
}

fn base_tag_score(name: &QualName) -> f32 {
    match *name {
        tag!("div") => 5.0,
        tag!("pre") | tag!("td") | tag!("blockquote") => 3.0,
        tag!("address") | tag!("ol") | tag!("ul") | tag!("dl") | tag!("dd") | tag!("dt") | tag!("li") | tag!("form") => -3.0,
        tag!("h1") | tag!("h2") | tag!("h3") | tag!("h4") | tag!("h5") | tag!("h6") | tag!("th") => -5.0,
        _ => 0.0,
    }
}

fn initialize_node(node: &NodeRef, cache: &mut NodeCache<ScoreInfo>, flags: &Flags) {
    let base = node.as_element().map_or(0.0, |e| base_tag_score(&e.name));
    let score = base + class_weight(node, flags);
    cache.insert(node, ScoreInfo { score });
}

fn select_scorable(body: &NodeRef, flags: &Flags) -> Vec<NodeRef> {
    let mut to_score = Vec::new();
    let mut nodes: Vec<NodeRef> = body.descendants().elements().map(|e| e.as_node().clone()).collect();
    let mut idx = 0;

    while idx < nodes.len() {
        let n = nodes[idx].clone();
        idx += 1;

        if is_unlikely(&n, flags) {
            trace!("select_scorable: removing unlikely candidate");
            n.remove();
            nodes = body.descendants().elements().map(|e| e.as_node().clone()).collect();
            idx = idx.saturating_sub(1);
            continue;
        }

        let tag = match n.as_element() {
            Some(e) => e.name.clone(),
            None => continue,
        };

        if tag == tag!("p") || tag == tag!("td") || tag == tag!("pre") {
            to_score.push(n.clone());
        } else if tag == tag!("div") {
            if !has_block_child(&n) {
                let newp = node_copy(&n, Some(tag!("p")));
                n.replace(&newp);
                // both the original reference and the retagged copy are
                // scored; reproduced verbatim for fidelity.
                to_score.push(n.clone());
                to_score.push(newp);
            } else {
                to_score.extend(paragraphize_text(&n));
            }
        }
    }

    to_score
}

fn score_paras(nodes: &[NodeRef], body: &NodeRef, cache: &mut NodeCache<ScoreInfo>, flags: &Flags) -> NodeRef {
    let mut candidates: Vec<NodeRef> = Vec::new();

    for n in nodes {
        let parent = match n.parent() {
            Some(p) => p,
            None => continue,
        };
        let gparent = parent.parent();

        let text = inner_text(n, true);
        if text.chars().count() < 25 {
            continue;
        }

        if !cache.is_annotated(&parent) {
            initialize_node(&parent, cache, flags);
            candidates.push(parent.clone());
        }
        if let Some(g) = &gparent {
            if !cache.is_annotated(g) {
                initialize_node(g, cache, flags);
                candidates.push(g.clone());
            }
        }

        // off-by-one preserved: a zero-comma text still yields a split
        // count of 1.
        let score = 1.0
            + text.split(',').count() as f32
            + (text.chars().count() as f32 / 100.0).floor().min(3.0);

        cache.get_mut(&parent).unwrap().score += score;
        if let Some(g) = &gparent {
            cache.get_mut(g).unwrap().score += score / 2.0;
        }
    }

    select_top(&candidates, body, cache, flags)
}

fn select_top(candidates: &[NodeRef], body: &NodeRef, cache: &mut NodeCache<ScoreInfo>, flags: &Flags) -> NodeRef {
    for n in candidates {
        let ld = link_density(n);
        if let Some(info) = cache.get_mut(n) {
            info.score *= 1.0 - ld;
        }
    }

    let mut top: Option<NodeRef> = None;
    for n in candidates {
        let score = cache.get(n).unwrap().score;
        let is_new_top = match &top {
            None => true,
            Some(t) => score > cache.get(t).unwrap().score,
        };
        if is_new_top {
            top = Some(n.clone());
        }
    }

    let top_is_body = top.as_ref().map_or(true, |t| t.is(tag!("body")));
    let top = if top_is_body {
        let newdiv = NodeRef::new_element(tag!("div"), iter::empty());
        let children: Vec<NodeRef> = body.children().collect();
        for child in children {
            child.remove();
            newdiv.append(child);
        }
        body.append(newdiv.clone());
        initialize_node(&newdiv, cache, flags);
        initialize_node(body, cache, flags);
        newdiv
    } else {
        top.unwrap()
    };

    let top_score = cache.get(&top).unwrap().score;
    let threshold = (top_score * 0.2).max(10.0);
    let top_class = top
        .as_element()
        .and_then(|e| e.attributes.borrow().get(attrib!("class")).map(|s| s.to_string()))
        .unwrap_or_default();

    let content = NodeRef::new_element(tag!("div"), iter::empty());

    let siblings: Vec<NodeRef> = top.parent().map(|p| p.children().collect()).unwrap_or_default();
    for n in siblings {
        let mut append = same_node(&n, &top);

        let mut bonus = 0.0;
        if !top_class.is_empty() {
            if let Some(e) = n.as_element() {
                let attrs = e.attributes.borrow();
                if attrs.get(attrib!("class")) == Some(top_class.as_str()) {
                    bonus = top_score * 0.2;
                }
            }
        }
        if let Some(info) = cache.get(&n) {
            if info.score + bonus >= threshold {
                append = true;
            }
        }

        if n.is(tag!("p")) {
            let ld = link_density(&n);
            let text = inner_text(&n, true);
            let len = text.chars().count();
            if len > 80 && ld < 0.25 {
                append = true;
            } else if len < 80 && ld == 0.0 && SENT_RE.is_match(&text) {
                append = true;
            }
        }

        if append {
            let needs_div = !(n.is(tag!("div")) || n.is(tag!("p")));
            let final_n = if needs_div { n.rename(tag!("div")) } else { n };
            final_n.remove();
            content.append(final_n);
        }
    }

    prep_article(&content, cache, flags);
    content
}

// ---------------------------------------------------------------------
// Extraction controller (§4.6)
// ---------------------------------------------------------------------

#[derive(Clone, Copy)]
enum FlagBit {
    StripUnlikely,
    ClassWeight,
    CleanConditionally,
}

#[derive(Clone, Copy)]
struct Flags {
    strip_unlikely: bool,
    class_weight: bool,
    clean_conditionally: bool,
}

impl Flags {
    fn clear(&mut self, bit: FlagBit) {
        match bit {
            FlagBit::StripUnlikely => self.strip_unlikely = false,
            FlagBit::ClassWeight => self.class_weight = false,
            FlagBit::CleanConditionally => self.clean_conditionally = false,
        }
    }
}

/// Builder and entry point for article extraction.
pub struct Readability {
    strip_unlikelys: bool,
    weight_classes: bool,
    clean_conditionally: bool,
    base_url: Option<Url>,
}

impl Default for Readability {
    fn default() -> Self {
        Self::new()
    }
}

impl Readability {
    pub fn new() -> Readability {
        Readability {
            strip_unlikelys: true,
            weight_classes: true,
            clean_conditionally: true,
            base_url: None,
        }
    }

    pub fn strip_unlikelys(&mut self, enabled: bool) -> &mut Self {
        self.strip_unlikelys = enabled;
        self
    }

    pub fn weight_classes(&mut self, enabled: bool) -> &mut Self {
        self.weight_classes = enabled;
        self
    }

    pub fn clean_conditionally(&mut self, enabled: bool) -> &mut Self {
        self.clean_conditionally = enabled;
        self
    }

    pub fn base_url<U>(&mut self, url: U) -> &mut Self
    where
        U: Into<Option<Url>>,
    {
        self.base_url = url.into();
        self
    }

    /// Convenience over [`Readability::base_url`] for callers who only
    /// have a string and would rather not pull in the `url` crate
    /// themselves.
    pub fn with_base_url(&mut self, url: &str) -> Result<&mut Self, ReadabilityError> {
        self.base_url = Some(Url::parse(url)?);
        Ok(self)
    }

    pub fn parse(&mut self, html: &str) -> (NodeRef, Metadata) {
        let (content, metadata) = self.grab_article(html);
        if let Some(base) = &self.base_url {
            fix_relative_urls(&content, base);
        }
        (content, metadata)
    }

    fn grab_article(&self, data: &str) -> (NodeRef, Metadata) {
        let doc = kuchikiki::parse_html().one(data);
        let metadata = metadata::extract(&doc);

        let mut flags = Flags {
            strip_unlikely: self.strip_unlikelys,
            class_weight: self.weight_classes,
            clean_conditionally: self.clean_conditionally,
        };

        // First queue entry is a no-op: the first pass always runs with
        // whatever flags were configured (all on, by default).
        let mut queue: VecDeque<Option<FlagBit>> = VecDeque::from(vec![
            None,
            Some(FlagBit::StripUnlikely),
            Some(FlagBit::ClassWeight),
            Some(FlagBit::CleanConditionally),
        ]);

        loop {
            let next = queue.pop_front().expect("queue is seeded with 4 entries");
            if let Some(bit) = next {
                flags.clear(bit);
            }

            let content = self.run_pipeline(data, &flags);

            if queue.is_empty() {
                return (content, metadata);
            }
            if inner_text(&content, false).chars().count() >= 250 {
                return (content, metadata);
            }
            trace!("grab_article: content too short, relaxing flags and retrying");
        }
    }

    fn run_pipeline(&self, data: &str, flags: &Flags) -> NodeRef {
        let mut cache = NodeCache::new();
        let body = prep_document(data);
        let to_score = select_scorable(&body, flags);
        score_paras(&to_score, &body, &mut cache, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize(node: &NodeRef) -> String {
        node.to_string()
    }

    #[test]
    fn br_runs_become_paragraphs() {
        let body = prep_document("<div>one<br>two<br><br>three</div>");
        let html = serialize(&body);
        assert!(html.contains("<p>one</p>"));
        assert!(html.contains("<p>two</p>"));
        assert!(html.contains("<p>three</p>"));
    }

    #[test]
    fn body_level_brs_survive_into_returned_content() {
        let body = prep_document("<body>Hello<br>World, enough text here, to pass scoring thresholds easily.</body>");
        let html = serialize(&body);
        assert!(html.contains("<p>Hello</p>"));
        assert!(html.contains("<p>World, enough text here, to pass scoring thresholds easily.</p>"));
    }

    #[test]
    fn convert_brs_is_idempotent_without_brs() {
        let before = kuchikiki::parse_html().one("<html><body><div><p>hello</p></div></body></html>");
        let body_before = before.select_first("body").unwrap().as_node().clone();
        let rendered_before = serialize(&body_before);

        let body_after = prep_document("<div><p>hello</p></div>");
        let rendered_after = serialize(&body_after);

        assert_eq!(
            rendered_before.split_whitespace().collect::<Vec<_>>(),
            rendered_after.split_whitespace().collect::<Vec<_>>()
        );
    }

    #[test]
    fn strips_unlikely_sidebar_and_keeps_article() {
        let html = r#"
            <div id="sidebar"><p>Subscribe to our newsletter for more updates every single week, always free.</p></div>
            <div id="article"><p>This is the real article text, with enough commas, and plenty more content here, to score well.</p></div>
        "#;

        let mut r = Readability::new();
        let (content, _) = r.parse(html);
        let text = content.text_contents();

        assert!(text.contains("real article text"));
        assert!(!text.contains("newsletter"));
    }

    #[test]
    fn relaxes_strip_unlikely_when_everything_is_flagged() {
        let html = r#"
            <div id="sidebar">
                <div class="comment">
                    <p>This is actually the only real paragraph here, with enough commas, length, and content to qualify as readable text.</p>
                </div>
            </div>
        "#;

        let mut r = Readability::new();
        let (content, _) = r.parse(html);
        let text = content.text_contents();

        assert!(text.contains("only real paragraph"));
    }

    #[test]
    fn preserves_video_embeds_and_removes_ad_embeds() {
        let html = r#"
            <div>
                <embed src="http://youtube.com/v/x"></embed>
                <embed src="http://ads.example.com/x"></embed>
                <p>Sufficient surrounding article text here, with commas, and enough length to keep this block around for scoring purposes.</p>
            </div>
        "#;

        let mut r = Readability::new();
        let (content, _) = r.parse(html);
        let html_out = serialize(&content);

        assert!(html_out.contains("youtube.com"));
        assert!(!html_out.contains("ads.example.com"));
    }

    #[test]
    fn link_heavy_list_is_conditionally_removed() {
        let mut links = String::new();
        for i in 0..10 {
            links.push_str(&format!(r#"<li><a href="/{i}" class="content">link {i}</a></li>"#));
        }
        let html = format!(
            r#"<div id="article"><p>Real article prose with enough commas, length, and content here, to outscore the link list below, easily.</p><ul class="content">{links}</ul></div>"#
        );

        let mut r = Readability::new();
        let (content, _) = r.parse(&html);
        let html_out = serialize(&content);

        assert!(!html_out.contains("link 0"));
    }

    #[test]
    fn same_class_sibling_is_harvested() {
        let html = r#"
            <div class="post">This first post block has enough comma separated, prose, length, and content, to score very highly indeed, well above the sibling threshold used for harvesting.</div>
            <div class="post">This second post block shares the exact same class, and contains its own reasonably long paragraph of prose, with commas, to earn a respectable score on its own.</div>
        "#;

        let mut r = Readability::new();
        let (content, _) = r.parse(html);
        let text = content.text_contents();

        assert!(text.contains("first post block"));
        assert!(text.contains("second post block"));
    }

    #[test]
    fn class_weight_disabled_is_always_zero() {
        let html = kuchikiki::parse_html().one(r#"<div class="article-content" id="post">x</div>"#);
        let node = html.select_first("div").unwrap().as_node().clone();

        let off = Flags { strip_unlikely: true, class_weight: false, clean_conditionally: true };
        assert_eq!(class_weight(&node, &off), 0.0);

        let on = Flags { strip_unlikely: true, class_weight: true, clean_conditionally: true };
        assert!(class_weight(&node, &on) > 0.0);
    }

    #[test]
    fn link_density_is_zero_for_empty_text() {
        let html = kuchikiki::parse_html().one("<div></div>");
        let node = html.select_first("div").unwrap().as_node().clone();
        assert_eq!(link_density(&node), 0.0);
    }

    #[test]
    fn body_is_never_unlikely() {
        let html = kuchikiki::parse_html().one(r#"<body class="sidebar comment"></body>"#);
        let node = html.select_first("body").unwrap().as_node().clone();
        let flags = Flags { strip_unlikely: true, class_weight: true, clean_conditionally: true };
        assert!(!is_unlikely(&node, &flags));
    }

    #[test]
    fn relative_urls_are_resolved_against_base() {
        let html = r#"<div><a href="/a">a</a><img src="b.png"><a href="https://x.example/y">y</a><a href="#frag">frag</a></div>"#;
        let base = Url::parse("http://example.com/articles/index.html").unwrap();

        let doc = kuchikiki::parse_html().one(html);
        fix_relative_urls(&doc, &base);
        let out = doc.to_string();

        assert!(out.contains("http://example.com/a"));
        assert!(out.contains("http://example.com/articles/b.png"));
        assert!(out.contains("https://x.example/y"));
        assert!(out.contains("#frag"));
    }

    #[test]
    fn with_base_url_rejects_garbage() {
        let mut r = Readability::new();
        assert!(r.with_base_url("not a url").is_err());
    }
}
