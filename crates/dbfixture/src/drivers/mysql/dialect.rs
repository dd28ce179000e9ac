//! MySQL/MariaDB SQL dialect.

use crate::core::traits::Dialect;
use crate::core::value::ColumnType;
use crate::dialect::classify_mysql;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Handle names that contain backticks by doubling them
        format!("`{}`", name.replace('`', "``"))
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn max_params(&self) -> usize {
        // Prepared statement parameter count is a u16
        65_535
    }

    fn classify_type(&self, data_type: &str) -> ColumnType {
        classify_mysql(data_type)
    }
}
