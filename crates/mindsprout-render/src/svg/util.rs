use crate::model::LayoutPoint;
use std::fmt::Write as _;

/// Number formatting for SVG attributes: no `-0`, no float noise near integers.
pub(super) fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    if v == -0.0 {
        v = 0.0;
    }
    format!("{v}")
}

/// Path coordinates keep at most three fractional digits.
fn push_path_number(out: &mut String, v: f64) {
    if !v.is_finite() || v.abs() < 0.0005 {
        out.push('0');
        return;
    }
    let rounded = (v * 1000.0).round() / 1000.0;
    let _ = write!(out, "{}", fmt(rounded));
}

fn push_cmd(out: &mut String, cmd: char, coords: &[f64]) {
    out.push(cmd);
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_path_number(out, *c);
    }
}

pub(super) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// B-spline through `points` (d3 `curveBasis` semantics).
pub(super) fn curve_basis_path_d(points: &[LayoutPoint]) -> String {
    let mut out = String::with_capacity(points.len().saturating_mul(64));
    let Some(first) = points.first() else {
        return out;
    };
    push_cmd(&mut out, 'M', &[first.x, first.y]);
    if points.len() == 2 {
        push_cmd(&mut out, 'L', &[points[1].x, points[1].y]);
        return out;
    }

    let segment = |out: &mut String, p0: LayoutPoint, p1: LayoutPoint, p: LayoutPoint| {
        push_cmd(
            out,
            'C',
            &[
                (2.0 * p0.x + p1.x) / 3.0,
                (2.0 * p0.y + p1.y) / 3.0,
                (p0.x + 2.0 * p1.x) / 3.0,
                (p0.y + 2.0 * p1.y) / 3.0,
                (p0.x + 4.0 * p1.x + p.x) / 6.0,
                (p0.y + 4.0 * p1.y + p.y) / 6.0,
            ],
        );
    };

    for (i, window) in points.windows(3).enumerate() {
        let (p0, p1, p) = (window[0], window[1], window[2]);
        if i == 0 {
            push_cmd(
                &mut out,
                'L',
                &[(5.0 * p0.x + p1.x) / 6.0, (5.0 * p0.y + p1.y) / 6.0],
            );
        }
        segment(&mut out, p0, p1, p);
    }
    if let [.., p0, p1] = points {
        segment(&mut out, *p0, *p1, *p1);
        push_cmd(&mut out, 'L', &[p1.x, p1.y]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_trims_noise() {
        assert_eq!(fmt(-0.0), "0");
        assert_eq!(fmt(12.0000000001), "12");
        assert_eq!(fmt(1.5), "1.5");
        assert_eq!(fmt(f64::NAN), "0");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml(r#"a<b & "c">"#), "a&lt;b &amp; &quot;c&quot;&gt;");
    }

    #[test]
    fn basis_curve_through_three_points() {
        let pts = [
            LayoutPoint { x: 0.0, y: 0.0 },
            LayoutPoint { x: 6.0, y: 6.0 },
            LayoutPoint { x: 12.0, y: 0.0 },
        ];
        assert_eq!(
            curve_basis_path_d(&pts),
            "M0,0L1,1C2,2,4,4,6,4C8,4,10,2,11,1L12,0"
        );
        assert_eq!(curve_basis_path_d(&pts[..2]), "M0,0L6,6");
        assert_eq!(curve_basis_path_d(&[]), "");
    }
}
