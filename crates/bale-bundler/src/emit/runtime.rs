//! The module registry every chunk starts with, and module keys.

use std::path::Path;

use bale_graph::ModuleId;

/// Installs `globalThis.__bale__` once per page. Chunks register factories
/// with `define` and entry chunks start their entry modules with `run`.
///
/// The per-module require function carries the interop helpers the script
/// transform emits calls to:
/// `r` marks an ES module, `d` installs export getters, `n` reads a default
/// export, `s` copies star exports and `i` loads a module asynchronously.
pub const PRELUDE: &str = r#"(function (g) {
  if (g.__bale__) return;
  var has = Object.prototype.hasOwnProperty;
  var factories = {};
  var cache = {};
  function load(id) {
    if (has.call(cache, id)) return cache[id].exports;
    if (!has.call(factories, id)) throw new Error("Cannot find module '" + id + "'");
    var record = factories[id];
    var module = (cache[id] = { id: id, exports: {} });
    record[0].call(module.exports, module, module.exports, scope(record[1]));
    return module.exports;
  }
  function scope(deps) {
    function require(specifier) {
      if (!has.call(deps, specifier)) throw new Error("Cannot find module '" + specifier + "'");
      return load(deps[specifier]);
    }
    require.r = function (exports) {
      Object.defineProperty(exports, "__esModule", { value: true });
    };
    require.d = function (exports, getters) {
      for (var key in getters) {
        if (has.call(getters, key) && !has.call(exports, key)) {
          Object.defineProperty(exports, key, { enumerable: true, get: getters[key] });
        }
      }
    };
    require.n = function (m) {
      return m && m.__esModule ? m["default"] : m;
    };
    require.s = function (exports, m) {
      Object.keys(m).forEach(function (key) {
        if (key !== "default" && !has.call(exports, key)) {
          Object.defineProperty(exports, key, { enumerable: true, get: function () { return m[key]; } });
        }
      });
    };
    require.i = function (specifier) {
      return Promise.resolve().then(function () { return require(specifier); });
    };
    return require;
  }
  g.__bale__ = {
    define: function (records) {
      for (var id in records) {
        if (has.call(records, id) && !has.call(factories, id)) factories[id] = records[id];
      }
    },
    run: function (ids) {
      for (var i = 0; i < ids.length; i++) load(ids[i]);
    }
  };
})(typeof globalThis !== "undefined" ? globalThis : this);
"#;

const HASHED_KEY_LENGTH: usize = 12;

/// Runtime key for a bundled module: the project-relative path when modules
/// are named, otherwise a short hash of it.
pub fn module_key(id: &ModuleId, root: &Path, named: bool) -> String {
    let relative = id.relative_to(root);
    if named {
        relative
    } else {
        let hex = blake3::hash(relative.as_bytes()).to_hex();
        hex[..HASHED_KEY_LENGTH].to_string()
    }
}

/// Runtime key for an external specifier.
pub fn external_key(specifier: &str) -> String {
    format!("external:{specifier}")
}

/// Factory body for an external: reads the module off the global object.
pub fn external_factory(global: &str) -> String {
    format!(
        "module.exports = globalThis[{}];",
        serde_json::Value::String(global.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys_are_relative_paths() {
        let id = ModuleId::new("/project/src/app.js");
        assert_eq!(module_key(&id, Path::new("/project"), true), "src/app.js");
    }

    #[test]
    fn hashed_keys_are_stable_and_short() {
        let id = ModuleId::new("/project/src/app.js");
        let key = module_key(&id, Path::new("/project"), false);
        assert_eq!(key.len(), 12);
        assert_eq!(key, module_key(&id, Path::new("/project"), false));
        // Independent of where the project lives.
        let moved = ModuleId::new("/elsewhere/src/app.js");
        assert_eq!(key, module_key(&moved, Path::new("/elsewhere"), false));
    }

    #[test]
    fn externals_read_globals() {
        assert_eq!(external_key("react"), "external:react");
        assert_eq!(external_factory("React"), "module.exports = globalThis[\"React\"];");
    }
}
