//! Templates shared by the integration tests.

#![allow(dead_code)]

use honeycomb_dsl::{FunctionTemplate, InputSpec, OutputSpec, PackageId, TemplateRegistry};

pub fn recipe_package() -> PackageId {
    PackageId::new("daylight-factor", "0.2.0")
}

pub fn math_package() -> PackageId {
    PackageId::new("honeycomb-math", "1.1.0")
}

pub fn radiance_package() -> PackageId {
    PackageId::new("honeybee-radiance", "1.4.3")
}

/// `n` -> `result`, both integers.
pub fn double_number() -> FunctionTemplate {
    FunctionTemplate::builder("DoubleNumber", math_package())
        .input(InputSpec::integer("n"))
        .output(OutputSpec::integer("result").with_path("output.txt"))
        .command("echo $(( {{self.n}} * 2 )) > output.txt")
        .build()
        .expect("double-number is valid")
}

/// Splits a grid file into a folder of grids and lists them.
pub fn split_grid() -> FunctionTemplate {
    FunctionTemplate::builder("SplitGrid", radiance_package())
        .input(InputSpec::file("input_grid").with_path("grid.pts"))
        .input(InputSpec::integer("grid_count").with_default(4))
        .output(OutputSpec::folder("output_folder").with_path("grids"))
        .output(OutputSpec::list("grids_info").with_path("grids/_info.json"))
        .command("honeybee-radiance grid split grid.pts {{self.grid_count}} --folder grids")
        .build()
        .expect("split-grid is valid")
}

/// Traces one grid against a model folder.
pub fn ray_trace() -> FunctionTemplate {
    FunctionTemplate::builder("RayTrace", radiance_package())
        .input(InputSpec::folder("model").with_path("model"))
        .input(InputSpec::file("grid").with_path("grid.pts"))
        .input(InputSpec::string("grid_name"))
        .input(InputSpec::string("radiance_parameters").with_default("-ab 2"))
        .output(OutputSpec::file("result").with_path("{{self.grid_name}}.res"))
        .command("honeybee-radiance raytrace model grid.pts {{self.radiance_parameters}}")
        .build()
        .expect("ray-trace is valid")
}

/// Writes the grids of a grid file to a JSON list.
pub fn list_grids() -> FunctionTemplate {
    FunctionTemplate::builder("ListGrids", radiance_package())
        .input(InputSpec::file("input_grid").with_path("grid.pts"))
        .output(OutputSpec::file("grids_file").with_path("grids.json"))
        .output(OutputSpec::folder("grids_folder").with_path("grids"))
        .command("honeybee-radiance grid list grid.pts --output grids.json")
        .build()
        .expect("list-grids is valid")
}

/// Registry holding every function above.
pub fn function_registry() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry
        .register_function(double_number())
        .expect("register double-number");
    registry
        .register_function(split_grid())
        .expect("register split-grid");
    registry
        .register_function(ray_trace())
        .expect("register ray-trace");
    registry
        .register_function(list_grids())
        .expect("register list-grids");
    registry
}
