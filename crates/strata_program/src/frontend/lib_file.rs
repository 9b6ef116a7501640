//! The bundled default library.

/// File name the default library is loaded under.
pub const DEFAULT_LIB_FILE_NAME: &str = "/__lib__/lib.d.ts";

/// Global types every program needs; missing ones are reported once per program.
pub const REQUIRED_GLOBAL_TYPES: &[&str] = &[
    "Array", "Boolean", "Function", "IArguments", "Number", "Object", "RegExp", "String",
];

/// The default library text.
pub const DEFAULT_LIB: &str = r#"/// Default library declarations.
interface Object { toString(): string; valueOf(): Object; hasOwnProperty(key: string): boolean; }
interface Function { apply(thisArg: any, args?: any): any; call(thisArg: any, ...args: any[]): any; bind(thisArg: any, ...args: any[]): any; readonly name: string; }
interface IArguments { [index: number]: any; length: number; }
interface String { readonly length: number; charAt(pos: number): string; indexOf(search: string, position?: number): number; slice(start?: number, end?: number): string; split(separator: string): string[]; toUpperCase(): string; toLowerCase(): string; trim(): string; startsWith(search: string): boolean; endsWith(search: string): boolean; includes(search: string): boolean; replace(search: string, replacement: string): string; }
interface Number { toFixed(digits?: number): string; toString(radix?: number): string; }
interface Boolean { valueOf(): boolean; }
interface RegExp { test(input: string): boolean; readonly source: string; }
interface Array<T> { length: number; push(...items: T[]): number; pop(): T | undefined; join(separator?: string): string; map<U>(f: (value: T, index: number) => U): U[]; filter(f: (value: T, index: number) => boolean): T[]; forEach(f: (value: T, index: number) => void): void; indexOf(value: T): number; includes(value: T): boolean; slice(start?: number, end?: number): T[]; concat(...items: T[][]): T[]; reduce<U>(f: (acc: U, value: T) => U, initial: U): U; [n: number]: T; }
interface ReadonlyArray<T> { readonly length: number; readonly [n: number]: T; }
interface Error { name: string; message: string; stack?: string; }
interface ErrorConstructor { new (message?: string): Error; (message?: string): Error; }
interface Date { getTime(): number; toISOString(): string; }
interface DateConstructor { new (value?: number | string): Date; now(): number; }
interface Promise<T> { then<U>(onfulfilled: (value: T) => U): Promise<U>; catch(onrejected: (reason: any) => any): Promise<T>; }
interface PromiseConstructor { resolve<T>(value: T): Promise<T>; reject(reason?: any): Promise<never>; }
interface Math { abs(x: number): number; floor(x: number): number; ceil(x: number): number; round(x: number): number; max(...values: number[]): number; min(...values: number[]): number; random(): number; sqrt(x: number): number; pow(x: number, y: number): number; readonly PI: number; }
interface JSON { parse(text: string): any; stringify(value: any, replacer?: any, space?: string | number): string; }
interface Console { log(...data: any[]): void; error(...data: any[]): void; warn(...data: any[]): void; info(...data: any[]): void; }
interface ObjectConstructor { keys(o: object): string[]; assign(target: any, ...sources: any[]): any; freeze<T>(o: T): T; }
type Record<K, T> = { [P in K]: T };
type Partial<T> = { [P in keyof T]?: T[P] };
type Readonly<T> = { readonly [P in keyof T]: T[P] };
declare var NaN: number;
declare var Infinity: number;
declare var console: Console;
declare var Math: Math;
declare var JSON: JSON;
declare var Object: ObjectConstructor;
declare var Error: ErrorConstructor;
declare var Date: DateConstructor;
declare var Promise: PromiseConstructor;
declare function parseInt(text: string, radix?: number): number;
declare function parseFloat(text: string): number;
declare function isNaN(value: number): boolean;
declare function setTimeout(handler: (...args: any[]) => void, timeout?: number): number;
declare function clearTimeout(id?: number): void;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_file::SourceFile;
    use strata_common::FilePath;

    #[test]
    fn library_parses_cleanly_and_declares_required_types() {
        let file = SourceFile::parse(
            FilePath::from_canonical(DEFAULT_LIB_FILE_NAME),
            DEFAULT_LIB_FILE_NAME,
            DEFAULT_LIB,
        );
        assert!(file.parse_diagnostics().is_empty(), "{:?}", file.parse_diagnostics());
        assert!(file.is_declaration_file());
        assert!(!file.is_external_module());
        for name in REQUIRED_GLOBAL_TYPES {
            assert!(file.text().contains(&format!("interface {name}")), "{name}");
        }
    }
}
