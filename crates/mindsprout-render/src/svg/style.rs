use super::util::escape_xml;
use std::fmt::Write as _;

/// Branch palette; `section-{n}` uses entry `n % SECTION_COUNT`.
const FILLS: [&str; 11] = [
    "hsl(60, 100%, 73.5294117647%)",
    "hsl(80, 100%, 76.2745098039%)",
    "hsl(270, 100%, 76.2745098039%)",
    "hsl(300, 100%, 76.2745098039%)",
    "hsl(330, 100%, 76.2745098039%)",
    "hsl(0, 100%, 76.2745098039%)",
    "hsl(30, 100%, 76.2745098039%)",
    "hsl(90, 100%, 76.2745098039%)",
    "hsl(150, 100%, 76.2745098039%)",
    "hsl(180, 100%, 76.2745098039%)",
    "hsl(210, 100%, 76.2745098039%)",
];

pub(super) const SECTION_COUNT: usize = FILLS.len();

const ROOT_FILL: &str = "hsl(240, 100%, 46.2745098039%)";

pub(super) fn mindmap_css(diagram_id: &str, font_family: &str, font_size: f64) -> String {
    let id = escape_xml(diagram_id);
    let mut out = String::new();

    let _ = write!(
        &mut out,
        "#{id}{{font-family:{font};font-size:{size}px;fill:#333;}}",
        font = escape_xml(font_family),
        size = super::util::fmt(font_size),
    );
    let _ = write!(&mut out, "#{id} .edge{{fill:none;stroke-width:3;}}");
    let _ = write!(
        &mut out,
        "#{id} .mindmap-node-label{{text-anchor:middle;dominant-baseline:middle;}}"
    );

    for (section, fill) in FILLS.iter().enumerate() {
        let label = if section == 2 { "#ffffff" } else { "black" };
        let _ = write!(
            &mut out,
            "#{id} .section-{section} rect{{fill:{fill};}}#{id} .section-{section} text{{fill:{label};}}#{id} .section-edge-{section}{{stroke:{fill};}}"
        );
    }
    for depth in 1..=5usize {
        let width = 17 - 3 * depth.min(5) as i64;
        let _ = write!(
            &mut out,
            "#{id} .edge-depth-{depth}{{stroke-width:{width};}}"
        );
    }

    let _ = write!(
        &mut out,
        "#{id} .section-root rect{{fill:{ROOT_FILL};}}#{id} .section-root text{{fill:#ffffff;}}"
    );
    let _ = write!(
        &mut out,
        "#{id} .loading rect{{stroke:#999999;stroke-width:2;stroke-dasharray:4 3;opacity:0.7;}}"
    );
    let _ = write!(
        &mut out,
        "#{id} .selected rect{{stroke:#ff9800;stroke-width:3;}}"
    );
    let _ = write!(&mut out, "#{id} .dimmed{{opacity:0.35;}}");
    out
}
