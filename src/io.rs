/// Reader for the Gmsh MSH 4.1 ASCII format
pub mod gmsh;
