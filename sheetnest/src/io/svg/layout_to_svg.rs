use crate::entities::{NestInstance, NestingResult, Part, Placement, SheetLayout};
use crate::geometry::pose::Pose;
use crate::geometry::primitives::Rect;
use crate::io::export::export_layout;
use crate::io::svg::svg_util;
use crate::io::svg::svg_util::SvgDrawOptions;
use itertools::Itertools;
use log::warn;
use svg::Document;
use svg::node::element::{Definitions, Group, Text, Title, Use};

/// Renders one sheet of a result as an SVG document.
///
/// Placements are emitted as `<use>` references to one `<defs>` entry per
/// distinct outline, transformed by their pose. The renderer only serializes:
/// it never alters or recomputes placements.
pub fn layout_to_svg(
    layout: &SheetLayout,
    instance: &NestInstance,
    options: SvgDrawOptions,
    title: &str,
) -> Document {
    let sheet_rect = Rect {
        x_min: 0.0,
        y_min: 0.0,
        x_max: instance.sheet.width,
        y_max: instance.sheet.height,
    };
    let vbox = sheet_rect.scale(1.10);
    let vbox_svg = (vbox.x_min, vbox.y_min, vbox.width(), vbox.height());

    Document::new()
        .set("viewBox", vbox_svg)
        .set("xmlns:xlink", "http://www.w3.org/1999/xlink")
        .add(sheet_group(layout, instance, &options, title))
}

/// Renders every sheet of a result into one document, stacked vertically.
pub fn result_to_svg(
    result: &NestingResult,
    instance: &NestInstance,
    options: SvgDrawOptions,
    title: &str,
) -> Document {
    let width = instance.sheet.width;
    let height = instance.sheet.height;
    let pitch = height * 1.10;
    let count = result.sheets.len().max(1);

    let mut document = Document::new()
        .set(
            "viewBox",
            (
                -0.05 * width,
                -0.05 * height,
                1.10 * width,
                pitch * count as f64,
            ),
        )
        .set("xmlns:xlink", "http://www.w3.org/1999/xlink");
    for (i, layout) in result.sheets.iter().enumerate() {
        document = document.add(
            Group::new()
                .set("transform", format!("translate(0 {})", i as f64 * pitch))
                .add(sheet_group(layout, instance, &options, title)),
        );
    }
    document
}

fn sheet_group(
    layout: &SheetLayout,
    instance: &NestInstance,
    options: &SvgDrawOptions,
    title: &str,
) -> Group {
    let theme = &options.theme;
    let width = instance.sheet.width;
    let height = instance.sheet.height;
    let stroke_width = f64::min(width, height) * 0.001 * theme.stroke_width_multiplier;

    let mut group = Group::new().set("id", format!("sheet_{}", layout.sheet_index));

    if options.draw_sheet {
        let sheet_rect = Rect {
            x_min: 0.0,
            y_min: 0.0,
            x_max: width,
            y_max: height,
        };
        group = group.add(
            svg_util::data_to_path(
                svg_util::rect_data(&sheet_rect),
                &[
                    ("fill", &*format!("{}", theme.sheet_fill)),
                    ("stroke", "black"),
                    ("stroke-width", &*format!("{}", 2.0 * stroke_width)),
                ],
            )
            .add(Title::new(format!(
                "sheet, index: {}, {}x{} mm",
                layout.sheet_index, width, height
            ))),
        );
        if let Ok(usable) = instance.sheet.usable_rect()
            && instance.sheet.margin > 0.0
        {
            group = group.add(svg_util::data_to_path(
                svg_util::rect_data(&usable),
                &[
                    ("fill", "none"),
                    ("stroke", "black"),
                    ("stroke-width", &*format!("{}", stroke_width)),
                    ("stroke-opacity", "0.4"),
                    ("stroke-dasharray", &*format!("{}", 5.0 * stroke_width)),
                    ("stroke-linecap", "round"),
                    ("stroke-linejoin", "round"),
                ],
            ));
        }
    }

    if options.draw_keep_outs {
        let stroke_color = svg_util::change_brightness(theme.keep_out_fill, 0.5);
        for keep_out in &instance.keep_outs {
            group = group.add(
                svg_util::data_to_path(
                    svg_util::rect_data(&keep_out.rect),
                    &[
                        ("fill", &*format!("{}", theme.keep_out_fill)),
                        ("fill-opacity", "0.50"),
                        ("stroke", &*format!("{}", stroke_color)),
                        ("stroke-width", &*format!("{}", 2.0 * stroke_width)),
                        (
                            "stroke-opacity",
                            &*format!("{}", theme.keep_out_stroke_opac),
                        ),
                        ("stroke-dasharray", &*format!("{}", 5.0 * stroke_width)),
                        ("stroke-linecap", "round"),
                        ("stroke-linejoin", "round"),
                    ],
                )
                .add(Title::new("keep-out zone".to_string())),
            );
        }
    }

    // one definition per distinct outline, referenced by every copy
    let placed: Vec<(&Placement, &Part)> = layout
        .placements
        .iter()
        .filter_map(|placement| {
            let part = instance
                .all_parts()
                .find(|part| part.id == placement.part_id);
            if part.is_none() {
                warn!(
                    "placement of '{}' has no matching part, skipping it in the export",
                    placement.part_id
                );
            }
            part.map(|part| (placement, part))
        })
        .collect();

    let mut defs = Definitions::new();
    for part in placed
        .iter()
        .map(|(_, part)| *part)
        .unique_by(|part| &part.shape_key)
    {
        defs = defs.add(
            svg_util::data_to_path(
                svg_util::polygon_set_data(&part.outline),
                &[
                    ("stroke", "black"),
                    ("stroke-width", &*format!("{}", stroke_width)),
                    ("fill-rule", "nonzero"),
                    ("opacity", "0.9"),
                ],
            )
            .set("id", format!("part_{}", part.shape_key)),
        );
        if options.highlight_cd_shapes {
            defs = defs.add(
                svg_util::data_to_path(
                    svg_util::polygon_set_data(&part.shape_cd),
                    &[
                        ("fill", "none"),
                        ("stroke", "black"),
                        ("stroke-width", &*format!("{}", 0.5 * stroke_width)),
                        ("stroke-opacity", "0.3"),
                        (
                            "stroke-dasharray",
                            &*format!("{} {}", stroke_width, 2.0 * stroke_width),
                        ),
                        ("stroke-linecap", "round"),
                        ("stroke-linejoin", "round"),
                    ],
                )
                .set("id", format!("cd_shape_{}", part.shape_key)),
            );
        }
    }
    let mut parts_group = Group::new().set("id", "parts").add(defs);

    for &(placement, part) in &placed {
        let fill = match placement.locked {
            true => theme.locked_part_fill,
            false => theme.part_fill,
        };
        let reference = Use::new()
            .set("transform", pose_to_svg(placement.pose))
            .set("xlink:href", format!("#part_{}", part.shape_key))
            .set("fill", format!("{fill}"))
            .add(Title::new(format!(
                "part, id: {}, pose: [{}]",
                placement.part_id, placement.pose
            )));
        parts_group = parts_group.add(reference);

        if options.highlight_cd_shapes {
            parts_group = parts_group.add(
                Use::new()
                    .set("transform", pose_to_svg(placement.pose))
                    .set("xlink:href", format!("#cd_shape_{}", part.shape_key)),
            );
        }
    }
    group = group.add(parts_group);

    let label = {
        let density = export_layout(layout, instance).density;
        let font_size = f64::min(width, height) * 0.025;
        Text::new(format!(
            "sheet {} | {}x{} mm | density: {:.1}% | {}",
            layout.sheet_index,
            width,
            height,
            density * 100.0,
            title,
        ))
        .set("x", 0.0)
        .set("y", -0.5 * font_size)
        .set("font-size", font_size)
        .set("font-family", "monospace")
        .set("font-weight", "500")
    };

    group.add(label)
}

fn pose_to_svg(pose: Pose) -> String {
    //https://developer.mozilla.org/en-US/docs/Web/SVG/Attribute/transform
    //operations are effectively applied from right to left
    let tx = pose.translation.0;
    let ty = pose.translation.1;
    let r = pose.rotation.degrees();
    match pose.mirrored {
        true => format!("translate({tx} {ty}), rotate({r}), scale(-1 1)"),
        false => format!("translate({tx} {ty}), rotate({r})"),
    }
}
