//! Styling real rasterizer output through the public API

use rmstamp_core::style::{self, MARKER_ATTR};
use rmstamp_core::{PageGeometry, StyleOptions, SvgDocument};

/// Shape of what the stroke rasterizer emits for a page with two strokes
const RASTERIZED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- page 3 -->
<svg xmlns="http://www.w3.org/2000/svg" height="792" width="612">
    <script type="application/ecmascript"> <![CDATA[
        var visiblePage = 'p1';
        function goToPage(page) {
            document.getElementById(visiblePage).setAttribute('style', 'display: none');
            visiblePage = page;
        }
    ]]> </script>
    <g id="p1" style="display:inline">
<filter id="blurMe"><feGaussianBlur in="SourceGraphic" stdDeviation="10" /></filter>
<polyline style="fill:none;stroke:blue;stroke-width:0.87;opacity:0" points="12.5,40 13,41.25 14,43"/>
<polyline style="fill:none;stroke:blue;stroke-width:0.87;opacity:0" points="100,100 120,140"/>
<text x="5" y="5">A &amp; B</text>
<rect x="0" y="0" width="612" height="792" fill-opacity="0"/>
    </g>
</svg>
"#;

fn letter() -> PageGeometry {
    PageGeometry::new(612.0, 792.0).unwrap()
}

fn stroke_styles(markup: &str) -> Vec<String> {
    let mut doc = SvgDocument::parse(markup).unwrap();
    let mut styles = Vec::new();
    doc.root_mut().walk_mut(&mut |e| {
        if style::is_stroke(e) {
            styles.push(e.attr("style").unwrap_or_default().to_string());
        }
    });
    styles
}

#[test]
fn test_prolog_script_and_text_survive() {
    let styled = style::apply(RASTERIZED, letter(), &StyleOptions::default()).unwrap();

    assert!(styled.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(styled.contains("<!-- page 3 -->"));
    assert!(styled.contains("<![CDATA["));
    assert!(styled.contains("setAttribute('style', 'display: none')"));
    assert!(styled.contains("A &amp; B"));
    assert!(styled.contains(r#"points="12.5,40 13,41.25 14,43""#));
}

#[test]
fn test_every_stroke_becomes_opaque() {
    let styled = style::apply(RASTERIZED, letter(), &StyleOptions::default()).unwrap();

    let styles = stroke_styles(&styled);
    assert_eq!(styles.len(), 2);
    assert!(styles
        .iter()
        .all(|s| s == "fill:none;stroke:blue;stroke-width:0.87;opacity:1"));
    assert!(!styled.contains("opacity:0"));
}

#[test]
fn test_all_options_together() {
    let options = StyleOptions {
        color: Some("#ff0000".to_string()),
        stroke_width: Some(1.5),
        margin_highlight: true,
        paling: true,
        highlight_color: "orange".to_string(),
        highlight_width: 6.0,
    };
    let styled = style::apply(RASTERIZED, letter(), &options).unwrap();
    let doc = SvgDocument::parse(&styled).unwrap();

    for s in stroke_styles(&styled) {
        assert_eq!(s, "fill:none;stroke:#ff0000;stroke-width:1.5;opacity:1");
    }

    let margin = doc.root().child_elements().last().unwrap();
    assert_eq!(margin.attr(MARKER_ATTR), Some("margin"));
    assert_eq!(margin.attr("fill"), Some("orange"));
    assert_eq!(margin.attr("width"), Some("6"));

    let sheet = styled.find(r#"data-rmstamp="paling""#).unwrap();
    let first_stroke = styled.find("<polyline").unwrap();
    let filter = styled.find("<filter").unwrap();
    assert!(filter < sheet && sheet < first_stroke);

    // the rasterizer's own transparent rect is not a stroke and keeps its fill
    assert!(styled.contains(r#"<rect x="0" y="0" width="612" height="792" fill-opacity="0"/>"#));
}

#[test]
fn test_restyling_styled_output_is_stable() {
    let options = StyleOptions {
        color: Some("green".to_string()),
        margin_highlight: true,
        paling: true,
        ..StyleOptions::default()
    };
    let once = style::apply(RASTERIZED, letter(), &options).unwrap();
    let twice = style::apply(&once, letter(), &options).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once.matches(MARKER_ATTR).count(), 2);
}

#[test]
fn test_non_svg_markup_is_rejected() {
    let result = style::apply("<html><body/></html>", letter(), &StyleOptions::default());
    assert!(result.is_err());
}
