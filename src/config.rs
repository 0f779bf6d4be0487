/// Names under which the driver publishes its proxy session capability.
///
/// The defaults are those of the Oracle JDBC driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySessionConfig {
    /// Driver connection type to load
    pub connection_type: String,
    /// Operation taking `(selector, properties)`
    pub operation: String,
    /// Per-connection field holding the "proxy by user name" selector
    pub proxy_type_field: String,
    /// Per-connection field holding the property key for the user name
    pub user_name_key_field: String,
    /// Per-connection field holding the property key for the password
    pub password_key_field: String,
}

impl Default for ProxySessionConfig {
    fn default() -> Self {
        Self {
            connection_type: "oracle.jdbc.OracleConnection".to_string(),
            operation: "openProxySession".to_string(),
            proxy_type_field: "PROXYTYPE_USER_NAME".to_string(),
            user_name_key_field: "PROXY_USER_NAME".to_string(),
            password_key_field: "PROXY_PASSWORD".to_string(),
        }
    }
}

impl ProxySessionConfig {
    pub fn oracle() -> Self {
        Self::default()
    }

    pub fn with_connection_type<S: Into<String>>(mut self, name: S) -> Self {
        self.connection_type = name.into();
        self
    }

    pub fn with_operation<S: Into<String>>(mut self, name: S) -> Self {
        self.operation = name.into();
        self
    }

    pub fn with_proxy_type_field<S: Into<String>>(mut self, name: S) -> Self {
        self.proxy_type_field = name.into();
        self
    }

    pub fn with_user_name_key_field<S: Into<String>>(mut self, name: S) -> Self {
        self.user_name_key_field = name.into();
        self
    }

    pub fn with_password_key_field<S: Into<String>>(mut self, name: S) -> Self {
        self.password_key_field = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_defaults() {
        let c = ProxySessionConfig::oracle();
        assert_eq!(c.connection_type, "oracle.jdbc.OracleConnection");
        assert_eq!(c.operation, "openProxySession");
        assert_eq!(c.proxy_type_field, "PROXYTYPE_USER_NAME");
        assert_eq!(c.user_name_key_field, "PROXY_USER_NAME");
        assert_eq!(c.password_key_field, "PROXY_PASSWORD");
    }

    #[test]
    fn builder_overrides() {
        let c = ProxySessionConfig::default()
            .with_connection_type("TestConn")
            .with_operation("changeSession");
        assert_eq!(c.connection_type, "TestConn");
        assert_eq!(c.operation, "changeSession");
        assert_eq!(c.proxy_type_field, "PROXYTYPE_USER_NAME");
    }
}
