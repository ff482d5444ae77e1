//! Undo/Redo command stack for AOI edits.
//!
//! Every AOI mutation is wrapped in a reversible `Command`. Creating an AOI
//! stores the created AOI itself, so redo re-inserts it with the same id
//! instead of allocating a new one. Deleting and clearing use **registry
//! snapshots**: the whole registry of the image is encoded with MessagePack
//! before and after the edit, and undo/redo swap it back in wholesale, which
//! restores the exact AOIs, ids, and insertion order.

use crate::context::SessionContext;
use crate::error::Result;
use gv_core::{Aoi, AoiId, AoiRegistry, Region};

/// An edit of the current image's AOI registry.
#[derive(Debug, Clone, PartialEq)]
pub enum AoiMutation {
    Create { region: Region },
    /// Put back an AOI (id included) at a given position.
    Restore { position: usize, aoi: Box<Aoi> },
    Delete { id: AoiId },
    ClearAll,
}

#[derive(Debug, Clone)]
pub enum Command {
    /// Single mutation with its inverse.
    Single {
        forward: Box<AoiMutation>,
        inverse: Box<AoiMutation>,
        description: String,
    },
    /// MessagePack-encoded registry before and after the edit.
    Snapshot {
        before: Vec<u8>,
        after: Vec<u8>,
        description: String,
    },
}

impl Command {
    pub fn description(&self) -> &str {
        match self {
            Command::Single { description, .. } | Command::Snapshot { description, .. } => {
                description
            }
        }
    }
}

/// Manages undo/redo stacks.
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(64)),
            redo_stack: Vec::new(),
            max_depth,
        }
    }

    /// Apply `mutation` to the context and record it for undo.
    /// Returns the id of the AOI a `Create` or `Restore` produced.
    pub fn execute(
        &mut self,
        ctx: &mut SessionContext,
        mutation: AoiMutation,
        description: &str,
    ) -> Result<Option<AoiId>> {
        let (cmd, created) = match mutation {
            AoiMutation::Create { region } => {
                let id = ctx.create_aoi(region)?;
                let registry = ctx.registry()?;
                let (position, aoi) = registry
                    .position(id)
                    .zip(registry.get(id).cloned())
                    .ok_or(gv_core::CoreError::UnknownAoi {
                        image: registry.image,
                        id,
                    })?;
                let cmd = Command::Single {
                    forward: Box::new(AoiMutation::Restore {
                        position,
                        aoi: Box::new(aoi),
                    }),
                    inverse: Box::new(AoiMutation::Delete { id }),
                    description: description.to_string(),
                };
                (cmd, Some(id))
            }
            AoiMutation::Restore { position, aoi } => {
                let id = aoi.id;
                ctx.restore_aoi(position, (*aoi).clone())?;
                let cmd = Command::Single {
                    forward: Box::new(AoiMutation::Restore { position, aoi }),
                    inverse: Box::new(AoiMutation::Delete { id }),
                    description: description.to_string(),
                };
                (cmd, Some(id))
            }
            AoiMutation::Delete { id } => {
                let before = encode(&ctx.registry()?)?;
                ctx.delete_aoi(id)?;
                let after = encode(&ctx.registry()?)?;
                (
                    Command::Snapshot {
                        before,
                        after,
                        description: description.to_string(),
                    },
                    None,
                )
            }
            AoiMutation::ClearAll => {
                let before = encode(&ctx.registry()?)?;
                ctx.clear_aois()?;
                let after = encode(&ctx.registry()?)?;
                (
                    Command::Snapshot {
                        before,
                        after,
                        description: description.to_string(),
                    },
                    None,
                )
            }
        };

        self.undo_stack.push(cmd);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }

        // Clear redo stack on new action
        self.redo_stack.clear();
        Ok(created)
    }

    /// Undo the last command. Returns its description, or `None` when
    /// there is nothing to undo. A failed undo leaves the command on the stack.
    pub fn undo(&mut self, ctx: &mut SessionContext) -> Result<Option<String>> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let applied = match &cmd {
            Command::Single { inverse, .. } => apply(ctx, inverse),
            Command::Snapshot { before, .. } => restore(ctx, before),
        };
        if let Err(err) = applied {
            log::warn!("undo of `{}` failed: {err}", cmd.description());
            self.undo_stack.push(cmd);
            return Err(err);
        }
        let desc = cmd.description().to_string();
        self.redo_stack.push(cmd);
        Ok(Some(desc))
    }

    /// Redo the last undone command.
    pub fn redo(&mut self, ctx: &mut SessionContext) -> Result<Option<String>> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let applied = match &cmd {
            Command::Single { forward, .. } => apply(ctx, forward),
            Command::Snapshot { after, .. } => restore(ctx, after),
        };
        if let Err(err) = applied {
            log::warn!("redo of `{}` failed: {err}", cmd.description());
            self.redo_stack.push(cmd);
            return Err(err);
        }
        let desc = cmd.description().to_string();
        self.undo_stack.push(cmd);
        Ok(Some(desc))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Forget all history, e.g. when switching images.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

fn apply(ctx: &mut SessionContext, mutation: &AoiMutation) -> Result<()> {
    match mutation {
        AoiMutation::Create { region } => ctx.create_aoi(*region).map(|_| ()),
        AoiMutation::Restore { position, aoi } => ctx.restore_aoi(*position, (**aoi).clone()),
        AoiMutation::Delete { id } => ctx.delete_aoi(*id).map(|_| ()),
        AoiMutation::ClearAll => ctx.clear_aois().map(|_| ()),
    }
}

fn encode(registry: &AoiRegistry) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec(registry)?)
}

fn restore(ctx: &mut SessionContext, bytes: &[u8]) -> Result<()> {
    let registry: AoiRegistry = rmp_serde::from_slice(bytes)?;
    ctx.replace_registry(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditorError;
    use gv_core::{ColorTag, Dataset, ImageData, ImageId, PersonId, Point, ScanPath};

    fn context() -> SessionContext {
        let path = ScanPath::new(
            PersonId::intern("cmd-p"),
            ColorTag::intern("color"),
            vec![Point::new(10.0, 10.0, 0.0), Point::new(150.0, 150.0, 1.0)],
        )
        .unwrap();
        let mut ds = Dataset::new();
        ds.insert(ImageData::new(ImageId::intern("cmd.jpg"), vec![path]));
        let mut ctx = SessionContext::new(ds);
        ctx.set_image(Some(ImageId::intern("cmd.jpg"))).unwrap();
        ctx
    }

    fn region(l: f32, t: f32, r: f32, b: f32) -> AoiMutation {
        AoiMutation::Create {
            region: Region::new(l, t, r, b).unwrap(),
        }
    }

    fn ids(ctx: &SessionContext) -> Vec<u32> {
        ctx.list_aois().iter().map(|a| a.id.0).collect()
    }

    #[test]
    fn undo_redo_create_keeps_id() {
        let mut ctx = context();
        let mut stack = CommandStack::new(100);
        stack.execute(&mut ctx, region(0.0, 0.0, 50.0, 50.0), "add").unwrap();
        let id = stack
            .execute(&mut ctx, region(100.0, 100.0, 200.0, 200.0), "add")
            .unwrap();
        assert_eq!(id, Some(AoiId(2)));

        assert_eq!(stack.undo(&mut ctx).unwrap().as_deref(), Some("add"));
        assert_eq!(ids(&ctx), vec![1]);
        stack.redo(&mut ctx).unwrap();
        assert_eq!(ids(&ctx), vec![1, 2]);
        assert_eq!(ctx.aoi(AoiId(2)).unwrap().member_count(), 1);
    }

    #[test]
    fn undo_delete_restores_id_and_position() {
        let mut ctx = context();
        let mut stack = CommandStack::new(100);
        for r in [(0.0, 0.0, 50.0, 50.0), (60.0, 0.0, 90.0, 90.0), (100.0, 100.0, 200.0, 200.0)] {
            stack.execute(&mut ctx, region(r.0, r.1, r.2, r.3), "add").unwrap();
        }
        stack
            .execute(&mut ctx, AoiMutation::Delete { id: AoiId(2) }, "delete")
            .unwrap();
        assert_eq!(ids(&ctx), vec![1, 3]);
        stack.undo(&mut ctx).unwrap();
        assert_eq!(ids(&ctx), vec![1, 2, 3]);
        stack.redo(&mut ctx).unwrap();
        assert_eq!(ids(&ctx), vec![1, 3]);
    }

    #[test]
    fn undo_clear_all() {
        let mut ctx = context();
        let mut stack = CommandStack::new(100);
        stack.execute(&mut ctx, region(0.0, 0.0, 50.0, 50.0), "add").unwrap();
        stack.execute(&mut ctx, AoiMutation::ClearAll, "clear").unwrap();
        assert!(ctx.list_aois().is_empty());
        stack.undo(&mut ctx).unwrap();
        assert_eq!(ids(&ctx), vec![1]);
        // The next id continues after the restored ones.
        let next = stack
            .execute(&mut ctx, region(100.0, 100.0, 200.0, 200.0), "add")
            .unwrap();
        assert_eq!(next, Some(AoiId(2)));
        assert!(!stack.can_redo());
    }

    #[test]
    fn failed_mutation_is_not_recorded() {
        let mut ctx = context();
        let mut stack = CommandStack::new(100);
        let err = stack
            .execute(&mut ctx, AoiMutation::Delete { id: AoiId(9) }, "delete")
            .unwrap_err();
        assert!(matches!(err, EditorError::Core(_)));
        assert!(!stack.can_undo());
    }

    #[test]
    fn depth_is_bounded() {
        let mut ctx = context();
        let mut stack = CommandStack::new(2);
        for i in 0..4 {
            let x = i as f32 * 10.0;
            stack.execute(&mut ctx, region(x, 0.0, x + 5.0, 5.0), "add").unwrap();
        }
        assert!(stack.undo(&mut ctx).unwrap().is_some());
        assert!(stack.undo(&mut ctx).unwrap().is_some());
        assert!(stack.undo(&mut ctx).unwrap().is_none());
        assert_eq!(ids(&ctx), vec![1, 2]);
    }
}
