//! Small navigation helpers over [`xmltree::Element`].

use xmltree::{Element, XMLNode};
use zone_engine::{PathStep, RuleRecord, ZoneField};

fn step_matches(element: &Element, tag: &str, name: Option<&str>) -> bool {
    element.name == tag
        && name.map_or(true, |n| element.attributes.get("name").map(String::as_str) == Some(n))
}

/// First child element called `tag`, optionally with `name="<name>"`.
pub(crate) fn child<'a>(parent: &'a Element, tag: &str, name: Option<&str>) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| match node {
        XMLNode::Element(e) if step_matches(e, tag, name) => Some(e),
        _ => None,
    })
}

pub(crate) fn child_mut<'a>(
    parent: &'a mut Element,
    tag: &str,
    name: Option<&str>,
) -> Option<&'a mut Element> {
    parent.children.iter_mut().find_map(|node| match node {
        XMLNode::Element(e) if step_matches(e, tag, name) => Some(e),
        _ => None,
    })
}

/// Every child element called `tag`.
pub(crate) fn children<'a>(parent: &'a Element, tag: &'a str) -> impl Iterator<Item = &'a Element> {
    parent.children.iter().filter_map(move |node| match node {
        XMLNode::Element(e) if e.name == tag => Some(e),
        _ => None,
    })
}

pub(crate) fn walk<'a>(root: &'a Element, steps: &[PathStep]) -> Option<&'a Element> {
    steps
        .iter()
        .try_fold(root, |node, step| child(node, &step.tag, step.name.as_deref()))
}

/// Every element reached by `steps`. Steps without a name predicate fan out
/// over all same-named siblings, so `vsys/entry` visits every vsys.
pub(crate) fn walk_all<'a>(root: &'a Element, steps: &[PathStep]) -> Vec<&'a Element> {
    let mut nodes = vec![root];
    for step in steps {
        nodes = nodes
            .into_iter()
            .flat_map(|node| {
                node.children.iter().filter_map(move |n| match n {
                    XMLNode::Element(e) if step_matches(e, &step.tag, step.name.as_deref()) => Some(e),
                    _ => None,
                })
            })
            .collect();
    }
    nodes
}

pub(crate) fn walk_all_mut<'a>(node: &'a mut Element, steps: &[PathStep], out: &mut Vec<&'a mut Element>) {
    let Some((step, rest)) = steps.split_first() else {
        out.push(node);
        return;
    };
    for child in node.children.iter_mut() {
        if let XMLNode::Element(e) = child {
            if step_matches(e, &step.tag, step.name.as_deref()) {
                walk_all_mut(e, rest, out);
            }
        }
    }
}

/// Text content of an element, empty when it has none.
pub(crate) fn text(element: &Element) -> String {
    element
        .get_text()
        .map(|t| t.into_owned())
        .unwrap_or_default()
}

/// Read `<entry name=..><to><member/>..</to><from>..</from></entry>`
/// children of a `rules` element.
pub(crate) fn rule_records(rules: &Element) -> Vec<RuleRecord> {
    children(rules, "entry")
        .map(|entry| {
            let zones = |field: ZoneField| -> Vec<String> {
                child(entry, field.tag(), None)
                    .map(|f| children(f, "member").map(text).collect())
                    .unwrap_or_default()
            };
            RuleRecord {
                name: entry.attributes.get("name").cloned().unwrap_or_default(),
                to: zones(ZoneField::To),
                from: zones(ZoneField::From),
            }
        })
        .collect()
}
