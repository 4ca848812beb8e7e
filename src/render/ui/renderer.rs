//! Scene renderer trait
//!
//! A `SceneRenderer` draws one [`RenderSnapshot`] per tick. It never mutates
//! controller state and owns the terminal (or log) lifecycle around drawing.

use crate::error::Result;
use crate::render::RenderSnapshot;

/// Core trait for drawing the controller's state
pub trait SceneRenderer {
    /// Draw the snapshot.
    ///
    /// Implementations should:
    /// - Redraw the whole frame from the snapshot alone
    /// - Show the dwell gauge and any active flash
    /// - Cope with whatever size the output currently has
    fn render(&mut self, snapshot: &RenderSnapshot) -> Result<()>;

    /// Prepare the output (raw mode, alternate screen, ...)
    fn initialize(&mut self) -> Result<()>;

    /// Restore the output to how it was found
    fn cleanup(&mut self) -> Result<()>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::controller::Mode;

    /// Mock renderer recording what it was asked to draw
    pub struct MockSceneRenderer {
        pub render_count: usize,
        pub is_initialized: bool,
        pub last_snapshot: Option<RenderSnapshot>,
    }

    impl Default for MockSceneRenderer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockSceneRenderer {
        pub fn new() -> Self {
            Self {
                render_count: 0,
                is_initialized: false,
                last_snapshot: None,
            }
        }
    }

    impl SceneRenderer for MockSceneRenderer {
        fn render(&mut self, snapshot: &RenderSnapshot) -> Result<()> {
            self.render_count += 1;
            self.last_snapshot = Some(snapshot.clone());
            Ok(())
        }

        fn initialize(&mut self) -> Result<()> {
            self.is_initialized = true;
            Ok(())
        }

        fn cleanup(&mut self) -> Result<()> {
            self.is_initialized = false;
            Ok(())
        }
    }

    #[test]
    fn test_mock_renderer_basic() {
        let mut renderer = MockSceneRenderer::new();
        let snapshot = RenderSnapshot {
            mode: Mode::Write,
            ..RenderSnapshot::default()
        };

        assert!(!renderer.is_initialized);
        renderer.initialize().unwrap();
        assert!(renderer.is_initialized);

        renderer.render(&snapshot).unwrap();
        assert_eq!(renderer.render_count, 1);
        assert_eq!(renderer.last_snapshot.as_ref().map(|s| s.mode), Some(Mode::Write));

        renderer.cleanup().unwrap();
        assert!(!renderer.is_initialized);
    }
}
