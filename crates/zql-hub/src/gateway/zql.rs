//! [`QueryCompiler`] backed by the `zql-core` compiler.

use zql_core::{CompiledQuery, Database, ZqlError};

use super::QueryCompiler;

#[derive(Debug, Clone, Copy, Default)]
pub struct ZqlCompiler;

impl QueryCompiler for ZqlCompiler {
    type Compiled = CompiledQuery;
    type Error = ZqlError;

    fn compile(&self, prefix: &str, query: &str) -> Result<CompiledQuery, ZqlError> {
        zql_core::compile(prefix, query)
    }

    fn emit_mongo(
        &self,
        compiled: &CompiledQuery,
        db: &Database,
        collection: &str,
    ) -> Result<String, ZqlError> {
        zql_core::mongo::emit(compiled, db, collection)
    }

    fn emit_influx(&self, compiled: &CompiledQuery, measurement: &str) -> Result<String, ZqlError> {
        zql_core::influx::emit(compiled, measurement)
    }

    fn emit_elastic(&self, compiled: &CompiledQuery) -> Result<String, ZqlError> {
        zql_core::elastic::emit(compiled)
    }
}
