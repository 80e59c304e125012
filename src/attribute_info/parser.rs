use nom::{
    bytes::complete::take,
    error::Error,
    multi::count,
    number::complete::{be_u16, be_u32},
    Err as BaseErr,
};

use crate::attribute_info::*;
use crate::error::{ClassFileError, ClassFileResult};

// Using a type alias here evades a Clippy warning about complex types.
type Err<E> = BaseErr<Error<E>>;

pub fn attribute_parser(input: &[u8]) -> Result<(&[u8], AttributeInfo), Err<&[u8]>> {
    let (input, attribute_name_index) = be_u16(input)?;
    let (input, attribute_length) = be_u32(input)?;
    let (input, info) = take(attribute_length)(input)?;
    Ok((
        input,
        AttributeInfo {
            attribute_name_index,
            attribute_length,
            info: info.to_owned(),
        },
    ))
}

pub fn exception_entry_parser(input: &[u8]) -> Result<(&[u8], ExceptionEntry), Err<&[u8]>> {
    let (input, start_pc) = be_u16(input)?;
    let (input, end_pc) = be_u16(input)?;
    let (input, handler_pc) = be_u16(input)?;
    let (input, catch_type) = be_u16(input)?;
    Ok((
        input,
        ExceptionEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        },
    ))
}

pub fn code_attribute_parser(input: &[u8]) -> Result<(&[u8], CodeAttribute), Err<&[u8]>> {
    let (input, max_stack) = be_u16(input)?;
    let (input, max_locals) = be_u16(input)?;
    let (input, code_length) = be_u32(input)?;
    let (input, code) = take(code_length)(input)?;
    let (input, exception_table_length) = be_u16(input)?;
    let (input, exception_table) =
        count(exception_entry_parser, exception_table_length as usize)(input)?;
    let (input, attributes_count) = be_u16(input)?;
    let (input, attributes) = count(attribute_parser, attributes_count as usize)(input)?;
    Ok((
        input,
        CodeAttribute {
            max_stack,
            max_locals,
            code_length,
            code: code.to_owned(),
            exception_table_length,
            exception_table,
            attributes_count,
            attributes,
        },
    ))
}

pub fn line_number_table_attribute_parser(
    input: &[u8],
) -> Result<(&[u8], LineNumberTableAttribute), Err<&[u8]>> {
    let (input, line_number_table_length) = be_u16(input)?;
    let (input, line_number_table) = count(
        line_number_table_entry_parser,
        line_number_table_length as usize,
    )(input)?;
    Ok((
        input,
        LineNumberTableAttribute {
            line_number_table_length,
            line_number_table,
        },
    ))
}

pub fn line_number_table_entry_parser(
    input: &[u8],
) -> Result<(&[u8], LineNumberTableEntry), Err<&[u8]>> {
    let (input, start_pc) = be_u16(input)?;
    let (input, line_number) = be_u16(input)?;
    Ok((
        input,
        LineNumberTableEntry {
            start_pc,
            line_number,
        },
    ))
}

pub fn local_variable_table_attribute_parser(
    input: &[u8],
) -> Result<(&[u8], LocalVariableTableAttribute), Err<&[u8]>> {
    let (input, local_variable_table_length) = be_u16(input)?;
    let (input, local_variable_table) = count(
        local_variable_table_entry_parser,
        local_variable_table_length as usize,
    )(input)?;
    Ok((
        input,
        LocalVariableTableAttribute {
            local_variable_table_length,
            local_variable_table,
        },
    ))
}

pub fn local_variable_table_entry_parser(
    input: &[u8],
) -> Result<(&[u8], LocalVariableTableEntry), Err<&[u8]>> {
    let (input, start_pc) = be_u16(input)?;
    let (input, length) = be_u16(input)?;
    let (input, name_index) = be_u16(input)?;
    let (input, descriptor_index) = be_u16(input)?;
    let (input, index) = be_u16(input)?;
    Ok((
        input,
        LocalVariableTableEntry {
            start_pc,
            length,
            name_index,
            descriptor_index,
            index,
        },
    ))
}

fn bootstrap_method_parser(input: &[u8]) -> Result<(&[u8], BootstrapMethod), Err<&[u8]>> {
    let (input, bootstrap_method_ref) = be_u16(input)?;
    let (input, num_bootstrap_arguments) = be_u16(input)?;
    let (input, bootstrap_arguments) = count(be_u16, num_bootstrap_arguments as usize)(input)?;
    Ok((
        input,
        BootstrapMethod {
            bootstrap_method_ref,
            num_bootstrap_arguments,
            bootstrap_arguments,
        },
    ))
}

pub fn bootstrap_methods_attribute_parser(
    input: &[u8],
) -> Result<(&[u8], BootstrapMethodsAttribute), Err<&[u8]>> {
    let (input, num_bootstrap_methods) = be_u16(input)?;
    let (input, bootstrap_methods) =
        count(bootstrap_method_parser, num_bootstrap_methods as usize)(input)?;
    Ok((
        input,
        BootstrapMethodsAttribute {
            num_bootstrap_methods,
            bootstrap_methods,
        },
    ))
}

pub fn sourcefile_attribute_parser(
    input: &[u8],
) -> Result<(&[u8], SourceFileAttribute), Err<&[u8]>> {
    let (input, sourcefile_index) = be_u16(input)?;
    Ok((input, SourceFileAttribute { sourcefile_index }))
}

/// Run one of the attribute parsers over a whole attribute body, mapping nom's
/// error into a [`ClassFileError::Attribute`] naming the attribute.
pub fn parse_attribute<'a, T>(
    attribute: &'static str,
    info: &'a [u8],
    parser: impl Fn(&'a [u8]) -> Result<(&'a [u8], T), Err<&'a [u8]>>,
) -> ClassFileResult<T> {
    parser(info)
        .map(|(_, parsed)| parsed)
        .map_err(|_| ClassFileError::Attribute { attribute })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_attribute() {
        #[rustfmt::skip]
        let bytes: Vec<u8> = vec![
            0, 2, 0, 1,             // max_stack, max_locals
            0, 0, 0, 2, 0x04, 0xac, // code: iconst_1, ireturn
            0, 1, 0, 0, 0, 2, 0, 2, 0, 0,  // one finally handler
            0, 1,                   // one attribute
            0, 9, 0, 0, 0, 6, 0, 1, 0, 0, 0, 12, // LineNumberTable body
        ];
        let (rest, code) = code_attribute_parser(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(code.max_stack, 2);
        assert_eq!(code.code, vec![0x04, 0xac]);
        assert_eq!(code.exception_table.len(), 1);
        assert!(code.exception_table[0].covers(1));
        assert!(!code.exception_table[0].covers(2));
        assert_eq!(code.attributes[0].attribute_name_index, 9);

        let lines = parse_attribute(
            "LineNumberTable",
            &code.attributes[0].info,
            line_number_table_attribute_parser,
        )
        .unwrap();
        assert_eq!(
            lines.line_number_table,
            vec![LineNumberTableEntry {
                start_pc: 0,
                line_number: 12
            }]
        );
    }

    #[test]
    fn test_truncated_attribute_is_reported() {
        let result = parse_attribute("LocalVariableTable", &[0, 1, 0], local_variable_table_attribute_parser);
        assert!(matches!(
            result,
            Err(ClassFileError::Attribute {
                attribute: "LocalVariableTable"
            })
        ));
    }

    #[test]
    fn test_bootstrap_methods() {
        let bytes = [0, 1, 0, 7, 0, 3, 0, 10, 0, 11, 0, 10];
        let bsm = parse_attribute("BootstrapMethods", &bytes, bootstrap_methods_attribute_parser).unwrap();
        assert_eq!(bsm.bootstrap_methods[0].bootstrap_method_ref, 7);
        assert_eq!(bsm.bootstrap_methods[0].bootstrap_arguments, vec![10, 11, 10]);
    }
}
