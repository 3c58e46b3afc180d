//! Local channel transport.
//!
//! A channel name maps to a Unix domain socket under the temp directory (an
//! absolute path is used as-is) or to a Windows named pipe. Both sides hand
//! out boxed read/write halves so the rest of the server is transport-agnostic.

use crate::error::server::{BindReason, LocalServerError};

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;

use tokio::io::{AsyncRead, AsyncWrite};

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Resolved OS endpoint for a channel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    #[cfg(unix)]
    path: std::path::PathBuf,
    #[cfg(windows)]
    pipe: String,
}

impl Endpoint {
    /// Resolve a channel name.
    ///
    /// # Errors
    ///
    /// Returns [`LocalServerError::Bind`] with [`BindReason::InvalidName`] for an
    /// empty name or a relative name containing a path separator.
    #[track_caller]
    pub fn resolve(name: &str) -> Result<Self, LocalServerError> {
        if name.trim().is_empty() {
            return Err(invalid_name(name, "channel name is empty"));
        }

        #[cfg(unix)]
        {
            let candidate = std::path::Path::new(name);
            if candidate.is_absolute() {
                return Ok(Self {
                    path: candidate.to_path_buf(),
                });
            }
            if name.contains('/') {
                return Err(invalid_name(name, "relative names cannot contain '/'"));
            }
            Ok(Self {
                path: std::env::temp_dir().join(name),
            })
        }

        #[cfg(windows)]
        {
            const PIPE_PREFIX: &str = r"\\.\pipe\";
            if name.starts_with(PIPE_PREFIX) {
                return Ok(Self {
                    pipe: name.to_string(),
                });
            }
            if name.contains('\\') {
                return Err(invalid_name(name, "names cannot contain '\\'"));
            }
            Ok(Self {
                pipe: format!("{PIPE_PREFIX}{name}"),
            })
        }
    }

    /// Remove the endpoint artifact left on disk, but only while it is still
    /// the one `owner` created. A newer primary's socket is left alone.
    pub(crate) fn release(&self, owner: &EndpointOwner) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;

            match std::fs::symlink_metadata(&self.path) {
                Ok(metadata) if metadata.dev() == owner.dev && metadata.ino() == owner.ino => {
                    self.remove_file();
                }
                Ok(_) => log::debug!(
                    "Socket {} was replaced by another listener, leaving it",
                    self.path.display()
                ),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to inspect socket {}: {e}", self.path.display()),
            }
        }
        #[cfg(windows)]
        let _ = owner;
    }

    #[cfg(unix)]
    fn remove_file(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed socket {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove socket {}: {e}", self.path.display()),
        }
    }

    /// Sibling file guarding probe, reclaim and bind of the socket.
    #[cfg(unix)]
    fn lock_path(&self) -> std::path::PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(".lock");
        path.into()
    }
}

/// Identifies the endpoint artifact one listener created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EndpointOwner {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
}

impl Display for Endpoint {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        #[cfg(unix)]
        {
            write!(formatter, "{}", self.path.display())
        }
        #[cfg(windows)]
        {
            formatter.write_str(&self.pipe)
        }
    }
}

#[track_caller]
fn invalid_name(name: &str, reason: &str) -> LocalServerError {
    LocalServerError::Bind {
        reason: BindReason::InvalidName,
        message: format!("'{name}': {reason}"),
        location: ErrorLocation::from(Location::caller()),
    }
}

#[track_caller]
fn bind_error(endpoint: &Endpoint, error: &IoError) -> LocalServerError {
    let reason = match error.kind() {
        ErrorKind::AddrInUse => BindReason::AlreadyRunning,
        ErrorKind::PermissionDenied => BindReason::PermissionDenied,
        ErrorKind::InvalidInput => BindReason::InvalidName,
        _ => BindReason::Io,
    };
    LocalServerError::Bind {
        reason,
        message: format!("Failed to bind {endpoint}: {error}"),
        location: ErrorLocation::from(Location::caller()),
    }
}

#[cfg(unix)]
pub(crate) use unix::{Listener, connect};

#[cfg(windows)]
pub(crate) use windows::{Listener, connect};

#[cfg(unix)]
mod unix {
    use super::{BoxedReader, BoxedWriter, Endpoint, EndpointOwner, bind_error};
    use crate::error::server::{BindReason, LocalServerError};

    use common::ErrorLocation;

    use std::fs::{File, OpenOptions};
    use std::io::{ErrorKind, Result as IoResult};
    use std::os::unix::fs::MetadataExt;
    use std::panic::Location;

    use log::{debug, info, warn};
    use rustix::fs::{FlockOperation, flock};
    use tokio::net::{UnixListener, UnixStream};

    /// Exclusive advisory lock, released when the file is closed.
    ///
    /// The lock file itself is never removed: unlinking it would let a later
    /// launch lock a fresh inode while an earlier one still holds the old one.
    struct BindLock {
        _file: File,
    }

    impl BindLock {
        async fn acquire(endpoint: &Endpoint) -> Result<Self, LocalServerError> {
            let path = endpoint.lock_path();
            let file = tokio::task::spawn_blocking(move || -> IoResult<File> {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&path)?;
                flock(&file, FlockOperation::LockExclusive)?;
                Ok(file)
            })
            .await
            .map_err(|e| LocalServerError::Io {
                message: format!("Lock task for {endpoint} failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?
            .map_err(|e| bind_error(endpoint, &e))?;

            debug!("Locked {endpoint} for binding");
            Ok(Self { _file: file })
        }
    }

    pub(crate) struct Listener {
        inner: UnixListener,
        owner: EndpointOwner,
    }

    impl Listener {
        /// Bind the endpoint, telling a live primary apart from a stale socket file.
        ///
        /// Probe, reclaim and bind run under an exclusive lock on `<socket>.lock`,
        /// so two launches racing over a stale socket cannot both become primary.
        pub(crate) async fn bind(
            endpoint: &Endpoint,
            reclaim_stale: bool,
        ) -> Result<Self, LocalServerError> {
            let _lock = BindLock::acquire(endpoint).await?;

            match UnixListener::bind(&endpoint.path) {
                Ok(inner) => Self::owning(endpoint, inner),
                Err(e) if e.kind() == ErrorKind::AddrInUse => {
                    if UnixStream::connect(&endpoint.path).await.is_ok() {
                        return Err(LocalServerError::Bind {
                            reason: BindReason::AlreadyRunning,
                            message: format!("Another instance is listening on {endpoint}"),
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }

                    if !reclaim_stale {
                        return Err(LocalServerError::Bind {
                            reason: BindReason::StaleEndpoint,
                            message: format!("{endpoint} exists but nobody is listening"),
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }

                    warn!("Reclaiming stale socket {endpoint}");
                    endpoint.remove_file();
                    let inner = UnixListener::bind(&endpoint.path)
                        .map_err(|e| bind_error(endpoint, &e))?;
                    Self::owning(endpoint, inner)
                }
                Err(e) => Err(bind_error(endpoint, &e)),
            }
        }

        fn owning(endpoint: &Endpoint, inner: UnixListener) -> Result<Self, LocalServerError> {
            let metadata =
                std::fs::symlink_metadata(&endpoint.path).map_err(|e| bind_error(endpoint, &e))?;
            Ok(Self {
                inner,
                owner: EndpointOwner {
                    dev: metadata.dev(),
                    ino: metadata.ino(),
                },
            })
        }

        pub(crate) fn owner(&self) -> EndpointOwner {
            self.owner
        }

        pub(crate) async fn accept(&mut self) -> IoResult<(BoxedReader, BoxedWriter)> {
            let (stream, _addr) = self.inner.accept().await?;
            let (reader, writer) = stream.into_split();
            Ok((Box::new(reader), Box::new(writer)))
        }
    }

    pub(crate) async fn connect(
        endpoint: &Endpoint,
    ) -> Result<(BoxedReader, BoxedWriter), LocalServerError> {
        let stream = UnixStream::connect(&endpoint.path)
            .await
            .map_err(|e| LocalServerError::Connect {
                message: format!("Failed to connect to {endpoint}: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;
        info!("Connected to {endpoint}");
        let (reader, writer) = stream.into_split();
        Ok((Box::new(reader), Box::new(writer)))
    }
}

#[cfg(windows)]
mod windows {
    use super::{BoxedReader, BoxedWriter, Endpoint, EndpointOwner, bind_error};
    use crate::error::server::{BindReason, LocalServerError};

    use common::ErrorLocation;

    use std::io::{ErrorKind, Result as IoResult};
    use std::mem;
    use std::panic::Location;

    use log::info;
    use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeServer, ServerOptions};

    const ERROR_PIPE_BUSY: i32 = 231;

    pub(crate) struct Listener {
        pending: NamedPipeServer,
        pipe: String,
    }

    impl Listener {
        /// Create the first pipe instance; a second primary fails here.
        pub(crate) async fn bind(
            endpoint: &Endpoint,
            _reclaim_stale: bool,
        ) -> Result<Self, LocalServerError> {
            match ServerOptions::new()
                .first_pipe_instance(true)
                .create(&endpoint.pipe)
            {
                Ok(pending) => Ok(Self {
                    pending,
                    pipe: endpoint.pipe.clone(),
                }),
                Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                    let owned = match ClientOptions::new().open(&endpoint.pipe) {
                        Ok(_) => true,
                        Err(e) => e.raw_os_error() == Some(ERROR_PIPE_BUSY),
                    };
                    if owned {
                        Err(LocalServerError::Bind {
                            reason: BindReason::AlreadyRunning,
                            message: format!("Another instance owns {endpoint}"),
                            location: ErrorLocation::from(Location::caller()),
                        })
                    } else {
                        Err(bind_error(endpoint, &e))
                    }
                }
                Err(e) => Err(bind_error(endpoint, &e)),
            }
        }

        /// Pipes vanish with their last handle; there is nothing to hand over.
        pub(crate) fn owner(&self) -> EndpointOwner {
            EndpointOwner {}
        }

        pub(crate) async fn accept(&mut self) -> IoResult<(BoxedReader, BoxedWriter)> {
            self.pending.connect().await?;
            let next = ServerOptions::new().create(&self.pipe)?;
            let connected = mem::replace(&mut self.pending, next);
            let (reader, writer) = tokio::io::split(connected);
            Ok((Box::new(reader), Box::new(writer)))
        }
    }

    pub(crate) async fn connect(
        endpoint: &Endpoint,
    ) -> Result<(BoxedReader, BoxedWriter), LocalServerError> {
        let client =
            ClientOptions::new()
                .open(&endpoint.pipe)
                .map_err(|e| LocalServerError::Connect {
                    message: format!("Failed to connect to {endpoint}: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        info!("Connected to {endpoint}");
        let (reader, writer) = tokio::io::split(client);
        Ok((Box::new(reader), Box::new(writer)))
    }
}
