pub mod ambient;
pub mod arguments;
pub mod codec;
pub mod context;
pub mod conversions;
pub mod descriptor;
pub mod descriptor_cache;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod tests;

pub use ambient::{AmbientKind, SupportedAmbientTypes};
pub use arguments::{Argument, Arguments};
pub use codec::{CodecError, JsonCodec, RecordSchema, SerdeJsonCodec};
pub use context::{AmbientContext, AmbientValue, Principal, RequestInfo, ResponseHandle, Session};
pub use conversions::{ConversionError, ConversionService, DefaultConversionService};
pub use descriptor::{CallDescriptor, ParameterDescriptor, ParameterSummary};
pub use descriptor_cache::{DescriptorCache, DescriptorKey};
pub use resolver::ParameterResolver;
pub use types::{BindingSource, OperationKind, ParamType};
