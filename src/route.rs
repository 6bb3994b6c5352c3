use std::fmt;
use std::str::FromStr;

use crate::error::{CompileError, RegistrationError};
use crate::params::Params;
use crate::path_template::PathTemplate;

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Connect,
    Options,
    Trace,
}

impl Method {
    pub const ALL: [Method; 9] = [
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Connect,
        Method::Options,
        Method::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
        }
    }
}

impl FromStr for Method {
    type Err = RegistrationError;

    // Method names are case-sensitive, "get" is not GET.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| RegistrationError::UnsupportedMethod(s.to_string()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered route: method, the template as written, its compiled
/// matcher, and an opaque handler.
#[derive(Debug)]
pub struct Route<H> {
    method: Method,
    template: String,
    path: PathTemplate,
    handler: H,
}

impl<H> Route<H> {
    pub fn new(method: Method, template: &str, handler: H) -> Result<Self, CompileError> {
        Ok(Self {
            method,
            template: template.to_string(),
            path: PathTemplate::compile(template)?,
            handler,
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn matches(&self, method: Method, path: &str) -> bool {
        self.method == method && self.path.is_match(path)
    }

    pub fn extract_params(&self, path: &str) -> Option<Params> {
        self.path.extract_params(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        for method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
        assert!(matches!(
            "wrongmethod".parse::<Method>(),
            Err(RegistrationError::UnsupportedMethod(m)) if m == "wrongmethod"
        ));
        assert!("get".parse::<Method>().is_err());
    }

    #[test]
    fn test_route_matches_method_and_path() {
        let route = Route::new(Method::Get, "/test/{name}", ()).unwrap();
        assert!(route.matches(Method::Get, "/test/args"));
        assert!(!route.matches(Method::Post, "/test/args"));
        assert!(!route.matches(Method::Get, "/test"));
        assert_eq!(route.template(), "/test/{name}");
    }
}
