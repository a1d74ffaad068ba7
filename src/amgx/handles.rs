//! Scoped ownership of solver library handles
//!
//! Every handle is destroyed when its owner is dropped, including when a
//! later step of a construction fails. Owners created later must be dropped
//! first; declaring them in creation order as local variables, or in reverse
//! creation order as struct fields, does this.
use crate::traits::SolverLibrary;
use crate::types::Result;
use log::warn;
use paste::paste;

macro_rules! scoped_handle {
    ($($name:ident => $destroy:ident),* $(,)?) => {
        paste! {
            $(
                #[doc = "Owner of a `" $name "` handle of a solver library"]
                pub struct [<Scoped $name>]<'a, L: SolverLibrary> {
                    library: &'a L,
                    handle: Option<L::$name>,
                }

                impl<'a, L: SolverLibrary> [<Scoped $name>]<'a, L> {
                    /// Take ownership of a handle
                    pub fn new(library: &'a L, handle: L::$name) -> Self {
                        Self {
                            library,
                            handle: Some(handle),
                        }
                    }

                    /// The handle
                    pub fn handle(&self) -> &L::$name {
                        self.handle
                            .as_ref()
                            .expect("handles are only released on drop")
                    }

                    /// The handle, mutably
                    pub fn handle_mut(&mut self) -> &mut L::$name {
                        self.handle
                            .as_mut()
                            .expect("handles are only released on drop")
                    }
                }

                impl<L: SolverLibrary> Drop for [<Scoped $name>]<'_, L> {
                    fn drop(&mut self) {
                        if let Some(handle) = self.handle.take() {
                            if let Err(e) = self.library.$destroy(handle) {
                                warn!("Could not destroy {} handle: {e}", stringify!($name));
                            }
                        }
                    }
                }
            )*
        }
    };
}

scoped_handle!(
    Config => config_destroy,
    Resources => resources_destroy,
    Solver => solver_destroy,
    Matrix => matrix_destroy,
    Vector => vector_destroy,
);

/// An initialised solver library, finalised on drop
pub struct Session<'a, L: SolverLibrary> {
    library: &'a L,
}

impl<'a, L: SolverLibrary> Session<'a, L> {
    /// Initialise the library
    pub fn new(library: &'a L) -> Result<Self> {
        library.initialize()?;
        Ok(Self { library })
    }
}

impl<L: SolverLibrary> Drop for Session<'_, L> {
    fn drop(&mut self) {
        if let Err(e) = self.library.finalize() {
            warn!("Could not finalize solver library: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ScopedConfig, ScopedMatrix, ScopedResources, Session};
    use crate::amgx::HostLibrary;
    use crate::comm::SelfComm;
    use crate::traits::SolverLibrary;
    use crate::types::Mode;

    #[test]
    fn test_release_order() {
        let library = HostLibrary::new(&SelfComm);
        {
            let _session = Session::new(&library).unwrap();
            let config = ScopedConfig::new(&library, library.config_create("").unwrap());
            let resources = ScopedResources::new(
                &library,
                library.resources_create_simple(config.handle()).unwrap(),
            );
            let _matrix = ScopedMatrix::new(
                &library,
                library
                    .matrix_create(resources.handle(), Mode::DeviceDDI)
                    .unwrap(),
            );
            assert_eq!(library.live_handles(), 3);
            assert!(library.is_initialized());
        }
        assert_eq!(library.live_handles(), 0);
        assert!(!library.is_initialized());
    }
}
