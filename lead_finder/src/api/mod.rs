mod api_doc;
pub use api_doc::*;

mod cache_middleware;
pub use cache_middleware::*;

mod export;
pub use export::*;

mod facilities;
pub use facilities::*;

mod healthcheck;
pub use healthcheck::*;

mod jobs;
pub use jobs::*;

mod upload;
pub use upload::*;
