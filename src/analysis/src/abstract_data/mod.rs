pub mod abstract_classes;
