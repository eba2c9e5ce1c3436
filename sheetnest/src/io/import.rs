use crate::NestError;
use crate::entities::{KeepOutRect, LockedPlacement, NestInstance, Part, PartBuilder};
use crate::geometry::pose::Rotation;
use crate::geometry::primitives::{Point, Rect};
use crate::io::ext_repr::{ExtKeepOut, ExtLockedPlacement, ExtNestJob, ExtPart, ExtShape};
use log::warn;

/// Converts external job descriptions into internal ones.
#[derive(Clone, Copy, Debug)]
pub struct Importer {
    /// Maximum curve flattening deviation in mm. See
    /// [`flatten_path`](crate::geometry::flatten::flatten_path).
    pub flatten_tolerance: f64,
}

impl Importer {
    pub fn new(flatten_tolerance: f64) -> Importer {
        Importer { flatten_tolerance }
    }

    /// Builds a [`NestInstance`] from a job description.
    ///
    /// Part definitions that fail to parse or produce no usable geometry are
    /// skipped with a warning, the rest of the job proceeds without them.
    /// Configuration problems are fatal: an unusable sheet, a degenerate
    /// keep-out, or a locked placement referencing a part that did not import.
    pub fn import_job(&self, ext_job: &ExtNestJob) -> Result<NestInstance, NestError> {
        ext_job.sheet.validate()?;

        let mut base_parts: Vec<(Part, usize)> = vec![];
        for ext_part in &ext_job.parts {
            match self.import_part(ext_part, ext_job.sheet.gap) {
                Ok(part) => base_parts.push((part, ext_part.count)),
                Err(e) => warn!("skipping part '{}': {e}", ext_part.id),
            }
        }

        let parts = base_parts
            .iter()
            .flat_map(|(part, count)| part.expand_copies(*count))
            .collect();

        let keep_outs = ext_job
            .keep_outs
            .iter()
            .map(import_keep_out)
            .collect::<Result<Vec<KeepOutRect>, NestError>>()?;

        let locked = ext_job
            .locked
            .iter()
            .map(|ext_lp| import_locked(ext_lp, &base_parts))
            .collect::<Result<Vec<(LockedPlacement, Part)>, NestError>>()?;

        Ok(NestInstance {
            parts,
            locked,
            sheet: ext_job.sheet,
            keep_outs,
            strategy: ext_job.strategy,
            seed: ext_job.seed,
            mode: ext_job.mode,
        })
    }

    /// Builds the base [`Part`] of one definition, count not yet expanded.
    pub fn import_part(&self, ext_part: &ExtPart, gap: f64) -> Result<Part, NestError> {
        let builder = PartBuilder::new(self.flatten_tolerance, gap);
        match &ext_part.shape {
            ExtShape::Path(data) => builder.from_path(&ext_part.id, data),
            ExtShape::Circle { radius } => builder.circle(&ext_part.id, *radius),
            ExtShape::Rectangle { width, height } => {
                builder.rectangle(&ext_part.id, *width, *height)
            }
            ExtShape::Capsule { length, radius } => {
                builder.capsule(&ext_part.id, *length, *radius)
            }
        }
    }
}

fn import_keep_out(ext: &ExtKeepOut) -> Result<KeepOutRect, NestError> {
    let rect = Rect::try_new(
        ext.x_min,
        ext.y_min,
        ext.x_min + ext.width,
        ext.y_min + ext.height,
    )
    .map_err(|_| {
        NestError::Config(format!(
            "keep-out at ({}, {}) with size {}x{} has no area",
            ext.x_min, ext.y_min, ext.width, ext.height
        ))
    })?;
    Ok(KeepOutRect { rect })
}

fn import_locked(
    ext: &ExtLockedPlacement,
    base_parts: &[(Part, usize)],
) -> Result<(LockedPlacement, Part), NestError> {
    let part = base_parts
        .iter()
        .map(|(part, _)| part)
        .find(|part| part.id == ext.part_id)
        .ok_or_else(|| {
            NestError::Config(format!(
                "locked placement references part '{}', which did not import",
                ext.part_id
            ))
        })?;
    let rotation = Rotation::from_degrees(ext.rotation).ok_or_else(|| {
        NestError::Config(format!(
            "locked rotation {}° is not a multiple of 90",
            ext.rotation
        ))
    })?;
    let locked = LockedPlacement {
        part_id: ext.part_id.clone(),
        sheet_index: ext.sheet,
        position: Point(ext.translation.0, ext.translation.1),
        rotation,
        mirrored: ext.mirrored,
    };
    Ok((locked, part.clone()))
}
