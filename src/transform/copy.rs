// src/transform/copy.rs

use std::path::PathBuf;

use crate::errors::{Result, SitepipeError};
use crate::exec::plan::SourceFile;
use crate::transform::{RenderContext, RenderFuture, Transform};

/// Copies every input to `dest/<path relative to base>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTransform;

impl Transform for CopyTransform {
    fn render<'a>(&'a self, ctx: &'a RenderContext, inputs: &'a [SourceFile]) -> RenderFuture<'a> {
        let ctx = ctx.clone();
        let inputs = inputs.to_vec();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || copy_all(&ctx, &inputs))
                .await
                .map_err(|e| SitepipeError::Other(e.into()))?
        })
    }
}

fn copy_all(ctx: &RenderContext, inputs: &[SourceFile]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(inputs.len());
    for input in inputs {
        let target = ctx.output_path(input);
        let bytes = ctx.fs.read(&input.path).map_err(SitepipeError::FileSystem)?;
        ctx.fs
            .write(&target, &bytes)
            .map_err(SitepipeError::FileSystem)?;
        written.push(target);
    }
    Ok(written)
}
