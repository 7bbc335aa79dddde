#[derive(Debug, Clone)]
pub struct RipThreadPool(RipThreadPoolImpl);

#[derive(Debug, Clone)]
enum RipThreadPoolImpl {
    #[cfg(feature = "rayon")]
    Rayon(std::sync::Arc<rayon_core::ThreadPool>),
    None,
}

#[derive(Debug, Copy, Clone)]
pub struct RipScope<'r, 'scope>(RipScopeInner<'r, 'scope>);

#[derive(Debug, Copy, Clone)]
enum RipScopeInner<'r, 'scope> {
    #[cfg(feature = "rayon")]
    Rayon(&'r rayon_core::Scope<'scope>),
    None(std::marker::PhantomData<&'r &'scope ()>),
}

#[cfg(feature = "rayon")]
impl Default for RipThreadPool {
    fn default() -> Self {
        let num_threads = std::thread::available_parallelism();
        let num_threads = match num_threads {
            Ok(num_threads) => num_threads.into(),
            Err(e) => {
                tracing::warn!(%e, "Failed to query available parallelism; falling back to single-threaded");
                return Self::none();
            },
        };

        let inner = rayon_core::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map(|pool| RipThreadPoolImpl::Rayon(std::sync::Arc::new(pool)));

        match inner {
            Ok(inner) => {
                tracing::debug!(num_threads, "Initialized Rayon thread pool");
                Self(inner)
            },
            Err(e) => {
                tracing::warn!(%e, "Failed to initialize thread pool; falling back to single-threaded");
                Self::none()
            },
        }
    }
}

#[cfg(not(feature = "rayon"))]
impl Default for RipThreadPool {
    fn default() -> Self {
        tracing::debug!("Not built with multithread support");
        Self::none()
    }
}

impl RipThreadPool {
    pub const fn none() -> Self {
        Self(RipThreadPoolImpl::None)
    }

    #[cfg(feature = "rayon")]
    pub fn rayon(pool: std::sync::Arc<rayon_core::ThreadPool>) -> Self {
        Self(RipThreadPoolImpl::Rayon(pool))
    }

    pub fn is_multithreaded(&self) -> bool {
        match self.0 {
            #[cfg(feature = "rayon")]
            RipThreadPoolImpl::Rayon(_) => true,
            RipThreadPoolImpl::None => false,
        }
    }
}

impl RipThreadPool {
    pub fn spawn(&self, op: impl FnOnce() + Send + 'static) {
        match &self.0 {
            #[cfg(feature = "rayon")]
            RipThreadPoolImpl::Rayon(pool) => pool.spawn(op),
            RipThreadPoolImpl::None => op(),
        }
    }

    pub fn scope<'scope, R: Send>(
        &'scope self,
        op: impl for<'r> FnOnce(RipScope<'r, 'scope>) -> R + Send,
    ) -> R {
        match &self.0 {
            #[cfg(feature = "rayon")]
            RipThreadPoolImpl::Rayon(pool) => {
                pool.scope(|scope| {
                    let scope = RipScope(RipScopeInner::Rayon(scope));
                    op(scope)
                })
            },
            RipThreadPoolImpl::None => {
                op(RipScope(RipScopeInner::None(Default::default())))
            },
        }
    }

    pub fn yield_now(&self) -> Option<RipYield> {
        match &self.0 {
            #[cfg(feature = "rayon")]
            RipThreadPoolImpl::Rayon(_) => rayon_core::yield_now().map(From::from),
            RipThreadPoolImpl::None => None,
        }
    }
}

impl<'scope> RipScope<'_, 'scope> {
    pub fn spawn(&self, op: impl for<'r> FnOnce(RipScope<'r, 'scope>) + Send + 'scope) {
        match self.0 {
            #[cfg(feature = "rayon")]
            RipScopeInner::Rayon(scope) => {
                scope.spawn(|scope| {
                    let scope = RipScope(RipScopeInner::Rayon(scope));
                    op(scope)
                })
            },
            RipScopeInner::None(_) => {
                op(RipScope(RipScopeInner::None(Default::default())))
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RipYield {
    Executed,
    Idle,
}

#[cfg(feature = "rayon")]
impl From<rayon_core::Yield> for RipYield {
    fn from(value: rayon_core::Yield) -> Self {
        match value {
            rayon_core::Yield::Executed => Self::Executed,
            rayon_core::Yield::Idle => Self::Idle,
        }
    }
}
