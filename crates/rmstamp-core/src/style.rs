//! Visual edits applied to one annotated page
//!
//! The rasterizer authors every stroke at zero opacity, in a default ink
//! color and width. Styling makes strokes visible and then applies the
//! configured overrides and decorations on the parsed tree.
//!
//! Ink and width overrides only replace the rasterizer's default tokens, so
//! strokes that already carry another color or width keep it.

use crate::config::StyleOptions;
use crate::error::Result;
use crate::geometry::PageGeometry;
use crate::svg::{format_number, Element, Node, SvgDocument};

/// Ink color the rasterizer uses for every stroke
pub const DEFAULT_INK: &str = "blue";

/// Stroke width the rasterizer uses for every stroke
pub const DEFAULT_STROKE_WIDTH: f64 = 0.87;

/// Elements that draw strokes
pub const STROKE_ELEMENTS: &[&str] = &["polyline", "path", "line", "polygon"];

/// Containers whose content is never painted directly
const NON_RENDERED: &[&str] = &["defs", "clipPath", "marker", "symbol", "mask", "pattern"];

/// Attribute tagging elements inserted by styling
pub const MARKER_ATTR: &str = "data-rmstamp";

const MARGIN_MARKER: &str = "margin";
const PALING_MARKER: &str = "paling";

/// Whether an element draws a stroke
pub fn is_stroke(element: &Element) -> bool {
    element.attr(MARKER_ATTR).is_none() && STROKE_ELEMENTS.contains(&element.local_name())
}

/// Style one page's markup
pub fn apply(markup: &str, geometry: PageGeometry, options: &StyleOptions) -> Result<String> {
    let mut doc = SvgDocument::parse(markup)?;
    apply_to_document(&mut doc, geometry, options);
    Ok(doc.to_markup()?)
}

/// Style an already parsed page in place
///
/// Applying this twice leaves the document as applying it once does.
pub fn apply_to_document(doc: &mut SvgDocument, geometry: PageGeometry, options: &StyleOptions) {
    let color = options.color.as_deref();
    let width = options.stroke_width.map(format_number);

    doc.root_mut().walk_mut(&mut |element| {
        if !is_stroke(element) {
            return;
        }
        element.set_paint_property("opacity", "1");
        if let Some(color) = color {
            if has_default_ink(element) {
                element.set_paint_property("stroke", color);
            }
        }
        if let Some(width) = &width {
            if has_default_width(element) {
                element.set_paint_property("stroke-width", width);
            }
        }
    });

    if options.paling {
        insert_paling(doc.root_mut(), geometry);
    }
    if options.margin_highlight {
        insert_margin_highlight(doc.root_mut(), geometry, options);
    }
}

/// Current value of a paint property, the style declaration winning over
/// the presentation attribute
fn paint_value(element: &Element, name: &str) -> Option<String> {
    element
        .style_property(name)
        .or_else(|| element.attr(name).map(str::to_string))
}

/// Whether the stroke still carries the rasterizer's ink
fn has_default_ink(element: &Element) -> bool {
    paint_value(element, "stroke").is_some_and(|v| v.trim().eq_ignore_ascii_case(DEFAULT_INK))
}

/// Whether the stroke still carries the rasterizer's width
fn has_default_width(element: &Element) -> bool {
    paint_value(element, "stroke-width")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .is_some_and(|w| (w - DEFAULT_STROKE_WIDTH).abs() < 1e-9)
}

/// Put a half-transparent white sheet beneath the first stroke
///
/// The sheet becomes the preceding sibling of the first painted stroke in
/// document order, or the first root child when the page has no strokes.
fn insert_paling(root: &mut Element, geometry: PageGeometry) {
    if has_marker(root, PALING_MARKER) {
        return;
    }

    let sheet = Element::new("rect")
        .with_attr(MARKER_ATTR, PALING_MARKER)
        .with_attr("x", "0")
        .with_attr("y", "0")
        .with_attr("width", format_number(geometry.width))
        .with_attr("height", format_number(geometry.height))
        .with_attr("fill", "white")
        .with_attr("fill-opacity", "0.5");

    if let Err(Node::Element(sheet)) = insert_before_first_stroke(root, Node::Element(sheet)) {
        root.children.insert(0, Node::Element(sheet));
    }
}

/// Insert `node` right before the first stroke below `parent`
///
/// Hands the node back when no stroke exists. Strokes inside non-rendered
/// containers such as `<defs>` are skipped.
fn insert_before_first_stroke(parent: &mut Element, node: Node) -> std::result::Result<(), Node> {
    let mut node = node;
    for i in 0..parent.children.len() {
        let Node::Element(child) = &mut parent.children[i] else {
            continue;
        };
        if is_stroke(child) {
            parent.children.insert(i, node);
            return Ok(());
        }
        if NON_RENDERED.contains(&child.local_name()) {
            continue;
        }
        match insert_before_first_stroke(child, node) {
            Ok(()) => return Ok(()),
            Err(back) => node = back,
        }
    }
    Err(node)
}

/// Append a full-height bar at the left edge, above all other content
fn insert_margin_highlight(root: &mut Element, geometry: PageGeometry, options: &StyleOptions) {
    if has_marker(root, MARGIN_MARKER) {
        return;
    }

    let bar = Element::new("rect")
        .with_attr(MARKER_ATTR, MARGIN_MARKER)
        .with_attr("x", "0")
        .with_attr("y", "0")
        .with_attr("width", format_number(options.highlight_width))
        .with_attr("height", format_number(geometry.height))
        .with_attr("fill", options.highlight_color.as_str());
    root.children.push(Node::Element(bar));
}

fn has_marker(root: &Element, marker: &str) -> bool {
    root.any(&|e| e.attr(MARKER_ATTR) == Some(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" height="792" width="612">
<g id="p1" style="display:inline">
<filter id="blurMe"><feGaussianBlur in="SourceGraphic" stdDeviation="10"/></filter>
<polyline style="fill:none;stroke:blue;stroke-width:0.87;opacity:0" points="10,10 20,20"/>
<polyline style="fill:none;stroke:blue;stroke-width:0.87;opacity:0" points="30,30 40,40"/>
</g>
</svg>"#;

    fn geometry() -> PageGeometry {
        PageGeometry::new(612.0, 792.0).unwrap()
    }

    fn strokes(doc: &SvgDocument) -> Vec<Element> {
        let mut found = Vec::new();
        let mut root = doc.root().clone();
        root.walk_mut(&mut |e| {
            if is_stroke(e) {
                found.push(e.clone());
            }
        });
        found
    }

    fn styled(options: &StyleOptions) -> SvgDocument {
        SvgDocument::parse(&apply(PAGE, geometry(), options).unwrap()).unwrap()
    }

    #[test]
    fn test_default_options_only_fix_opacity() {
        let doc = styled(&StyleOptions::default());
        let strokes = strokes(&doc);
        assert_eq!(strokes.len(), 2);
        for stroke in &strokes {
            assert_eq!(
                stroke.attr("style"),
                Some("fill:none;stroke:blue;stroke-width:0.87;opacity:1")
            );
        }
        assert!(!doc.root().any(&|e| e.attr(MARKER_ATTR).is_some()));
    }

    #[test]
    fn test_recolor_and_width() {
        let options = StyleOptions {
            color: Some("red".to_string()),
            stroke_width: Some(2.0),
            ..StyleOptions::default()
        };
        for stroke in strokes(&styled(&options)) {
            assert_eq!(stroke.style_property("stroke").as_deref(), Some("red"));
            assert_eq!(stroke.style_property("stroke-width").as_deref(), Some("2"));
            assert_eq!(stroke.style_property("opacity").as_deref(), Some("1"));
        }
    }

    #[test]
    fn test_overrides_leave_non_default_strokes_alone() {
        let page = r##"<svg>
<path stroke="#000" stroke-width="1.5" opacity="0" d="M0 0L1 1"/>
<polyline style="fill:none;stroke:white;stroke-width:3.5;opacity:0" points="0,0 5,5"/>
</svg>"##;
        let options = StyleOptions {
            color: Some("#ff0000".to_string()),
            stroke_width: Some(3.0),
            ..StyleOptions::default()
        };
        let doc = SvgDocument::parse(&apply(page, geometry(), &options).unwrap()).unwrap();
        let strokes: Vec<&Element> = doc.root().child_elements().collect();

        assert_eq!(strokes[0].attr("stroke"), Some("#000"));
        assert_eq!(strokes[0].attr("stroke-width"), Some("1.5"));
        assert_eq!(strokes[0].attr("opacity"), Some("1"));
        assert_eq!(
            strokes[1].attr("style"),
            Some("fill:none;stroke:white;stroke-width:3.5;opacity:1")
        );
    }

    #[test]
    fn test_overrides_reach_default_tokens_in_attributes() {
        let page = r#"<svg><path stroke="blue" stroke-width="0.870" opacity="0" d="M0 0"/></svg>"#;
        let options = StyleOptions {
            color: Some("#ff0000".to_string()),
            stroke_width: Some(3.0),
            ..StyleOptions::default()
        };
        let doc = SvgDocument::parse(&apply(page, geometry(), &options).unwrap()).unwrap();
        let path = doc.root().child_elements().next().unwrap();
        assert_eq!(path.attr("stroke"), Some("#ff0000"));
        assert_eq!(path.attr("stroke-width"), Some("3"));
        assert_eq!(path.attr("style"), None);
    }

    #[test]
    fn test_recolor_only_touches_default_ink_on_mixed_page() {
        let page = r#"<svg>
<polyline style="fill:none;stroke:blue;stroke-width:0.87;opacity:0" points="0,0 1,1"/>
<polyline style="fill:none;stroke:white;stroke-width:0.87;opacity:0" points="2,2 3,3"/>
</svg>"#;
        let options = StyleOptions {
            color: Some("red".to_string()),
            ..StyleOptions::default()
        };
        let doc = SvgDocument::parse(&apply(page, geometry(), &options).unwrap()).unwrap();
        let colors: Vec<Option<String>> = doc
            .root()
            .child_elements()
            .map(|e| e.style_property("stroke"))
            .collect();
        assert_eq!(
            colors,
            vec![Some("red".to_string()), Some("white".to_string())]
        );
    }

    #[test]
    fn test_margin_highlight_is_last_root_child() {
        let options = StyleOptions {
            margin_highlight: true,
            ..StyleOptions::default()
        };
        let doc = styled(&options);
        let last = doc.root().child_elements().last().unwrap();
        assert_eq!(last.attr(MARKER_ATTR), Some("margin"));
        assert_eq!(last.attr("x"), Some("0"));
        assert_eq!(last.attr("width"), Some("10"));
        assert_eq!(last.attr("height"), Some("792"));
        assert_eq!(last.attr("fill"), Some("#ffd900"));
    }

    #[test]
    fn test_paling_precedes_first_stroke() {
        let options = StyleOptions {
            paling: true,
            ..StyleOptions::default()
        };
        let doc = styled(&options);
        let group = doc.root().child_elements().next().unwrap();
        let children: Vec<&Element> = group.child_elements().collect();
        assert_eq!(children[0].local_name(), "filter");
        assert_eq!(children[1].attr(MARKER_ATTR), Some("paling"));
        assert_eq!(children[1].attr("fill-opacity"), Some("0.5"));
        assert_eq!(children[1].attr("width"), Some("612"));
        assert_eq!(children[1].attr("height"), Some("792"));
        assert_eq!(children[2].local_name(), "polyline");
        assert_eq!(children[3].local_name(), "polyline");
    }

    #[test]
    fn test_paling_skips_strokes_in_defs() {
        let page = r#"<svg><defs><marker id="m"><path d="M0 0L1 1"/></marker><polyline id="tpl" points="0,0 1,1"/></defs><g id="p1"><polyline points="2,2 3,3"/></g></svg>"#;
        let options = StyleOptions {
            paling: true,
            ..StyleOptions::default()
        };
        let doc = SvgDocument::parse(&apply(page, geometry(), &options).unwrap()).unwrap();

        let defs = doc.root().child_elements().next().unwrap();
        assert!(!defs.any(&|e| e.attr(MARKER_ATTR).is_some()));

        let group = doc.root().child_elements().nth(1).unwrap();
        let children: Vec<&Element> = group.child_elements().collect();
        assert_eq!(children[0].attr(MARKER_ATTR), Some("paling"));
        assert_eq!(children[1].local_name(), "polyline");
    }

    #[test]
    fn test_paling_without_strokes_is_first_root_child() {
        let page = r#"<svg><g id="empty"/></svg>"#;
        let options = StyleOptions {
            paling: true,
            ..StyleOptions::default()
        };
        let doc = SvgDocument::parse(&apply(page, geometry(), &options).unwrap()).unwrap();
        let first = doc.root().child_elements().next().unwrap();
        assert_eq!(first.attr(MARKER_ATTR), Some("paling"));
    }

    #[test]
    fn test_paling_goes_after_leading_non_stroke_content() {
        let page = r#"<svg><defs><marker id="m"/></defs><polyline points="0,0 1,1"/></svg>"#;
        let options = StyleOptions {
            paling: true,
            ..StyleOptions::default()
        };
        let doc = SvgDocument::parse(&apply(page, geometry(), &options).unwrap()).unwrap();
        let names: Vec<String> = doc
            .root()
            .child_elements()
            .map(|e| match e.attr(MARKER_ATTR) {
                Some(marker) => marker.to_string(),
                None => e.local_name().to_string(),
            })
            .collect();
        assert_eq!(names, vec!["defs", "paling", "polyline"]);
    }

    #[test]
    fn test_styling_is_idempotent() {
        let options = StyleOptions {
            color: Some("green".to_string()),
            stroke_width: Some(1.25),
            margin_highlight: true,
            paling: true,
            ..StyleOptions::default()
        };
        let once = apply(PAGE, geometry(), &options).unwrap();
        let twice = apply(&once, geometry(), &options).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_inserted_rects_are_not_strokes() {
        let options = StyleOptions {
            color: Some("red".to_string()),
            margin_highlight: true,
            paling: true,
            ..StyleOptions::default()
        };
        let doc = styled(&options);
        assert_eq!(strokes(&doc).len(), 2);
        let margin = doc.root().child_elements().last().unwrap();
        assert_eq!(margin.attr("style"), None);
    }
}
